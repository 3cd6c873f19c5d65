//! `btk` texture matrix animations (`TTK1`)
//!
//! Nine keyed channels per texture matrix, stored per axis in U, V, W order
//! (scale, rotation, translation for each). Matrices are named and carry the
//! texture matrix slot they drive plus a pivot center.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::brk::{read_index_table, read_names, write_index_table};
use super::codec::{
    AnimationFormat, HeaderTag, SectionReader, SectionWriter, TRANSFORM_SLOTS, encode_keyed,
    read_keyed,
};
use super::keyframe::{Channel, TangentType, rotation_scale};
use super::pool::{PoolFormat, ValuePool, read_pool};
use super::{LoopMode, Transform};
use crate::binary::{Padding, to_u16};
use crate::error::{Error, Result};
use crate::formats::common::write_string_table;

/// Absolute file offset of the calc-mode word.
const CALC_MODE_FIELD: u64 = 0x7C;
/// Size of one matrix table entry: 9 keyed records.
const ENTRY_SIZE: u32 = 0x36;

/// Keyed UVW transform of one texture matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TexMatrixTrack {
    /// Material name.
    pub name: String,
    /// Texture matrix slot of the material.
    pub texmtx_index: u8,
    /// Pivot for rotation and scale.
    pub center: [f32; 3],
    /// Rotations are in degrees.
    pub transform: Transform<Channel>,
}

impl TexMatrixTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, texmtx_index: u8, transform: Transform<Channel>) -> Self {
        Self {
            name: name.into(),
            texmtx_index,
            center: [0.0; 3],
            transform,
        }
    }
}

/// A keyed texture matrix animation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureMatrixAnimation {
    pub loop_mode: LoopMode,
    pub angle_scale: i8,
    pub duration: u16,
    pub tangent_type: TangentType,
    /// Word stored at absolute offset 0x7C, preserved verbatim.
    pub calc_mode: u32,
    pub matrices: Vec<TexMatrixTrack>,
    pub tag: HeaderTag,
}

impl Default for TextureMatrixAnimation {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::default(),
            angle_scale: 0,
            duration: 0,
            tangent_type: TangentType::default(),
            calc_mode: 0,
            matrices: Vec::new(),
            tag: Self::DEFAULT_TAG,
        }
    }
}

impl TextureMatrixAnimation {
    #[must_use]
    pub fn new(loop_mode: LoopMode, angle_scale: i8, duration: u16) -> Self {
        Self {
            loop_mode,
            angle_scale,
            duration,
            ..Self::default()
        }
    }
}

const POOL_FORMATS: [PoolFormat; 3] = [PoolFormat::F32, PoolFormat::S16, PoolFormat::F32];

impl AnimationFormat for TextureMatrixAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1btk1";
    const SECTION_MAGIC: [u8; 4] = *b"TTK1";
    const SECTION_NAME: &'static str = "TTK1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::SVR1;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        let angle_scale = s.read_i8()?;
        let duration = s.read_u16()?;
        let slot_count_at = s.position();
        let slot_count = s.read_u16()?;
        if slot_count % 3 != 0 {
            return Err(s.integrity(
                slot_count_at,
                format!("channel group count {slot_count} is not a multiple of 3"),
            ));
        }
        let count = slot_count / 3;
        let pool_counts = [s.read_u16()?, s.read_u16()?, s.read_u16()?];
        let table_offset = s.read_u32()?;
        let index_offset = s.read_u32()?;
        let names_offset = s.read_u32()?;
        let texmtx_offset = s.read_u32()?;
        let center_offset = s.read_u32()?;
        let pool_offsets = [s.read_u32()?, s.read_u32()?, s.read_u32()?];
        s.seek(CALC_MODE_FIELD)?;
        let calc_mode = s.read_u32()?;

        let mut pools = Vec::with_capacity(3);
        for ((offset, pool_count), format) in pool_offsets.into_iter().zip(pool_counts).zip(POOL_FORMATS) {
            let start = s.absolute(offset);
            pools.push(read_pool(s, start, usize::from(pool_count), format)?);
        }

        let index_start = s.absolute(index_offset);
        read_index_table(s, index_start, count)?;
        let names_start = s.absolute(names_offset);
        let names = read_names(s, names_start, count)?;

        s.seek_to(texmtx_offset)?;
        let texmtx_indices = s.read_bytes(usize::from(count))?;

        s.seek_to(center_offset)?;
        let mut centers = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            centers.push([s.read_f32()?, s.read_f32()?, s.read_f32()?]);
        }

        let scales = [1.0, rotation_scale(angle_scale), 1.0];
        let mut tangent_type = TangentType::In;
        let mut matrices = Vec::with_capacity(usize::from(count));
        for (i, (name, center)) in names.into_iter().zip(centers).enumerate() {
            s.seek_to(table_offset + ENTRY_SIZE * i as u32)?;
            let slots = read_keyed(s, &TRANSFORM_SLOTS, &pools, &scales, &mut tangent_type)?;
            matrices.push(TexMatrixTrack {
                name,
                texmtx_index: texmtx_indices[i],
                center,
                transform: Transform::from_slots(slots),
            });
        }

        debug!(matrices = matrices.len(), "decoded texture matrix animation");
        Ok(Self {
            loop_mode,
            angle_scale,
            duration,
            tangent_type,
            calc_mode,
            matrices,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        let count = to_u16(self.matrices.len(), "texture matrices")?;
        let slot_count = count
            .checked_mul(3)
            .ok_or_else(|| Error::TooManyEntries {
                what: "texture matrices",
                count: self.matrices.len(),
            })?;

        s.write_u8(self.loop_mode as u8)?;
        s.write_i8(self.angle_scale)?;
        s.write_u16(self.duration)?;
        s.write_u16(slot_count)?;
        let count_slots = [s.reserve_u16()?, s.reserve_u16()?, s.reserve_u16()?];
        let table_slot = s.reserve_u32()?;
        let index_slot = s.reserve_u32()?;
        let names_slot = s.reserve_u32()?;
        let texmtx_slot = s.reserve_u32()?;
        let center_slot = s.reserve_u32()?;
        let pool_slots = [s.reserve_u32()?, s.reserve_u32()?, s.reserve_u32()?];
        let gap = CALC_MODE_FIELD - s.position();
        s.write_fill(0, gap as usize)?;
        s.write_u32(self.calc_mode)?;

        let mut pools = [
            ValuePool::new("scale", PoolFormat::F32),
            ValuePool::new("rotation", PoolFormat::S16),
            ValuePool::new("translation", PoolFormat::F32),
        ];
        let scales = [1.0, rotation_scale(self.angle_scale), 1.0];

        s.fill_offset(table_slot)?;
        for matrix in &self.matrices {
            let entries = encode_keyed(
                matrix.transform.slots(),
                &TRANSFORM_SLOTS,
                &mut pools,
                &scales,
                self.tangent_type,
            )?;
            for entry in entries {
                entry.write(s)?;
            }
        }
        s.pad(4, Padding::Text)?;

        s.fill_offset(index_slot)?;
        write_index_table(s, self.matrices.len())?;

        s.fill_offset(names_slot)?;
        let names: Vec<&str> = self.matrices.iter().map(|m| m.name.as_str()).collect();
        write_string_table(s, &names)?;
        s.pad(4, Padding::Text)?;

        s.fill_offset(texmtx_slot)?;
        for matrix in &self.matrices {
            s.write_u8(matrix.texmtx_index)?;
        }
        s.pad(4, Padding::Text)?;

        s.fill_offset(center_slot)?;
        for value in self.matrices.iter().flat_map(|m| m.center) {
            s.write_f32(value)?;
        }
        s.pad(4, Padding::Text)?;

        let last = pools.len() - 1;
        for (i, ((pool, count_slot), pool_slot)) in pools.iter().zip(count_slots).zip(pool_slots).enumerate() {
            s.patch_u16(count_slot, pool.count()?)?;
            s.fill_offset(pool_slot)?;
            pool.write(s)?;
            s.pad(if i == last { 32 } else { 4 }, Padding::Text)?;
        }
        Ok(())
    }
}
