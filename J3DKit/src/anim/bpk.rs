//! `bpk` material color animations (`PAK1`)
//!
//! A single bank of RGBA color tracks. The layout matches one bank of `brk`
//! without the register byte: entries are four keyed records (`0x18` bytes).

use tracing::debug;

use super::LoopMode;
use super::brk::{
    ColorTrack, color_pools, encode_color_track, read_color_pools, read_index_table, read_names,
    write_index_table,
};
use super::codec::{AnimationFormat, COLOR_SLOTS, HeaderTag, SectionReader, SectionWriter, read_keyed};
use super::keyframe::TangentType;
use crate::binary::{Padding, to_u16};
use crate::error::Result;
use crate::formats::common::write_string_table;

/// A keyed material color animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAnimation {
    pub loop_mode: LoopMode,
    pub duration: u16,
    pub tangent_type: TangentType,
    pub materials: Vec<ColorTrack>,
    pub tag: HeaderTag,
}

impl Default for ColorAnimation {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::default(),
            duration: 0,
            tangent_type: TangentType::default(),
            materials: Vec::new(),
            tag: Self::DEFAULT_TAG,
        }
    }
}

impl ColorAnimation {
    #[must_use]
    pub fn new(loop_mode: LoopMode, duration: u16) -> Self {
        Self {
            loop_mode,
            duration,
            ..Self::default()
        }
    }
}

impl AnimationFormat for ColorAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1bpk1";
    const SECTION_MAGIC: [u8; 4] = *b"PAK1";
    const SECTION_NAME: &'static str = "PAK1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::SVR1;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        s.skip(3)?;
        let duration = s.read_u16()?;
        let count = s.read_u16()?;
        let pool_counts = [s.read_u16()?, s.read_u16()?, s.read_u16()?, s.read_u16()?];
        let table_offset = s.read_u32()?;
        let index_offset = s.read_u32()?;
        let names_offset = s.read_u32()?;
        let pool_offsets = [s.read_u32()?, s.read_u32()?, s.read_u32()?, s.read_u32()?];

        let starts = pool_offsets.map(|offset| s.absolute(offset));
        let pools = read_color_pools(s, starts, pool_counts)?;
        let index_start = s.absolute(index_offset);
        read_index_table(s, index_start, count)?;
        let names_start = s.absolute(names_offset);
        let mut names = read_names(s, names_start, count)?.into_iter();

        s.seek_to(table_offset)?;
        let mut tangent_type = TangentType::In;
        let mut materials = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let channels = read_keyed(s, &COLOR_SLOTS, &pools, &[1.0; 4], &mut tangent_type)?;
            materials.push(ColorTrack::new(names.next().unwrap_or_default(), channels));
        }

        debug!(materials = materials.len(), "decoded color animation");
        Ok(Self {
            loop_mode,
            duration,
            tangent_type,
            materials,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_bytes(&[0xFF; 3])?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.materials.len(), "material color tracks")?)?;
        let count_slots = [s.reserve_u16()?, s.reserve_u16()?, s.reserve_u16()?, s.reserve_u16()?];
        let table_slot = s.reserve_u32()?;
        let index_slot = s.reserve_u32()?;
        let names_slot = s.reserve_u32()?;
        let pool_slots = [s.reserve_u32()?, s.reserve_u32()?, s.reserve_u32()?, s.reserve_u32()?];
        s.pad(32, Padding::Text)?;

        let mut pools = color_pools();
        s.fill_offset(table_slot)?;
        for track in &self.materials {
            for entry in encode_color_track(track, &mut pools, self.tangent_type)? {
                entry.write(s)?;
            }
        }
        s.pad(4, Padding::Text)?;

        for ((pool, count_slot), pool_slot) in pools.iter().zip(count_slots).zip(pool_slots) {
            s.patch_u16(count_slot, pool.count()?)?;
            s.fill_offset(pool_slot)?;
            pool.write(s)?;
            s.pad(4, Padding::Text)?;
        }

        s.fill_offset(index_slot)?;
        write_index_table(s, self.materials.len())?;

        s.fill_offset(names_slot)?;
        let names: Vec<&str> = self.materials.iter().map(|m| m.name.as_str()).collect();
        write_string_table(s, &names)?;
        s.pad(4, Padding::Text)?;

        s.pad(32, Padding::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::keyframe::{Channel, Interpolation};
    use pretty_assertions::assert_eq;

    fn sample() -> ColorAnimation {
        let mut anim = ColorAnimation::new(LoopMode::MirrorLoop, 40);
        let fade = Channel::from_points(&[(0.0, 255.0), (40.0, 0.0)], Interpolation::Smooth);
        anim.materials = vec![
            ColorTrack::new(
                "mat_water",
                [Channel::constant(32.0), Channel::constant(96.0), Channel::constant(255.0), fade],
            ),
            ColorTrack::new("mat_sand", std::array::from_fn(|_| Channel::constant(200.0))),
        ];
        anim
    }

    #[test]
    fn test_round_trip() {
        let anim = sample();
        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1bpk1");
        assert_eq!(&bytes[0x10..0x14], b"SVR1");
        assert_eq!(bytes.len() % 32, 0);

        let decoded = ColorAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_entries_are_0x18_bytes() {
        let bytes = sample().to_bytes().unwrap();
        let table = u32::from_be_bytes(bytes[0x38..0x3C].try_into().unwrap()) as usize;
        assert_eq!(table + 0x20, 0x60);
        let red_pool = u32::from_be_bytes(bytes[0x44..0x48].try_into().unwrap()) as usize;
        // two entries of 0x18 bytes, already 4-aligned
        assert_eq!(red_pool, table + 2 * 0x18);
    }

    #[test]
    fn test_shared_values_deduplicated() {
        let bytes = sample().to_bytes().unwrap();
        // red pool holds 32 and 200, alpha holds the fade keys then 200
        assert_eq!(u16::from_be_bytes([bytes[0x30], bytes[0x31]]), 2);
        let decoded = ColorAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.materials[1].channels[2].keys[0].value, 200.0);
    }
}
