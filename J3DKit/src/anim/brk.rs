//! `brk` TEV color animations (`TRK1`)
//!
//! Two banks of material color tracks: TEV register colors and TEV constant
//! colors. Each bank has its own four `s16` RGBA pools, index table and name
//! table. Each entry also names the TEV register it drives.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LoopMode;
use super::codec::{
    AnimationFormat, COLOR_SLOTS, HeaderTag, KeyedEntry, SectionReader, SectionWriter,
    encode_keyed, read_keyed,
};
use super::keyframe::{Channel, TangentType};
use super::pool::{PoolFormat, ValuePool, read_pool};
use crate::binary::{BinaryReader, BinaryWriter, Padding, to_u16};
use crate::error::Result;
use crate::formats::common::{read_string_table, write_string_table};

/// Keyed RGBA channels of one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorTrack {
    /// Material name.
    pub name: String,
    /// TEV register driven by this track. Only stored by `brk`.
    pub register_index: u8,
    /// Red, green, blue and alpha.
    pub channels: [Channel; 4],
}

impl ColorTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, channels: [Channel; 4]) -> Self {
        Self {
            name: name.into(),
            register_index: 0,
            channels,
        }
    }
}

/// A TEV register and constant color animation.
#[derive(Debug, Clone, PartialEq)]
pub struct TevColorAnimation {
    pub loop_mode: LoopMode,
    pub duration: u16,
    pub tangent_type: TangentType,
    pub register: Vec<ColorTrack>,
    pub constant: Vec<ColorTrack>,
    pub tag: HeaderTag,
}

impl Default for TevColorAnimation {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::default(),
            duration: 0,
            tangent_type: TangentType::default(),
            register: Vec::new(),
            constant: Vec::new(),
            tag: Self::DEFAULT_TAG,
        }
    }
}

impl TevColorAnimation {
    #[must_use]
    pub fn new(loop_mode: LoopMode, duration: u16) -> Self {
        Self {
            loop_mode,
            duration,
            ..Self::default()
        }
    }
}

pub(crate) fn color_pools() -> [ValuePool; 4] {
    [
        ValuePool::new("red", PoolFormat::S16),
        ValuePool::new("green", PoolFormat::S16),
        ValuePool::new("blue", PoolFormat::S16),
        ValuePool::new("alpha", PoolFormat::S16),
    ]
}

pub(crate) fn read_color_pools(
    reader: &mut BinaryReader<'_>,
    starts: [u64; 4],
    counts: [u16; 4],
) -> Result<Vec<Vec<f32>>> {
    starts
        .into_iter()
        .zip(counts)
        .map(|(start, count)| read_pool(reader, start, usize::from(count), PoolFormat::S16))
        .collect()
}

pub(crate) fn encode_color_track(
    track: &ColorTrack,
    pools: &mut [ValuePool; 4],
    tangent_type: TangentType,
) -> Result<[KeyedEntry; 4]> {
    encode_keyed(track.channels.each_ref(), &COLOR_SLOTS, pools, &[1.0; 4], tangent_type)
}

/// Check that the index table at `start` lists `0..count` in order.
pub(crate) fn read_index_table(reader: &mut BinaryReader<'_>, start: u64, count: u16) -> Result<()> {
    reader.seek(start)?;
    for expected in 0..count {
        let position = reader.position();
        let index = reader.read_u16()?;
        if index != expected {
            return Err(reader.integrity(
                position,
                format!("index table entry {expected} holds {index}"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn write_index_table(writer: &mut BinaryWriter, count: usize) -> Result<()> {
    for index in 0..to_u16(count, "index table entries")? {
        writer.write_u16(index)?;
    }
    writer.pad(4, Padding::Text)
}

/// Read the name table at `start` and check it names every track.
pub(crate) fn read_names(reader: &mut BinaryReader<'_>, start: u64, count: u16) -> Result<Vec<String>> {
    let names = read_string_table(reader, start)?;
    if names.len() < usize::from(count) {
        return Err(reader.integrity(
            start,
            format!("name table has {} entries for {count} tracks", names.len()),
        ));
    }
    Ok(names)
}

struct Bank {
    count: u16,
    table: u32,
    index: u32,
    names: u32,
    pool_counts: [u16; 4],
    pool_offsets: [u32; 4],
}

fn read_bank(
    s: &mut SectionReader<'_>,
    bank: &Bank,
    tangent_type: &mut TangentType,
) -> Result<Vec<ColorTrack>> {
    let starts = bank.pool_offsets.map(|offset| s.absolute(offset));
    let pools = read_color_pools(s, starts, bank.pool_counts)?;
    let index_start = s.absolute(bank.index);
    read_index_table(s, index_start, bank.count)?;
    let names_start = s.absolute(bank.names);
    let mut names = read_names(s, names_start, bank.count)?.into_iter();

    s.seek_to(bank.table)?;
    let mut tracks = Vec::with_capacity(usize::from(bank.count));
    for _ in 0..bank.count {
        let channels = read_keyed(s, &COLOR_SLOTS, &pools, &[1.0; 4], tangent_type)?;
        let register_index = s.read_u8()?;
        s.skip(3)?;
        tracks.push(ColorTrack {
            name: names.next().unwrap_or_default(),
            register_index,
            channels,
        });
    }
    Ok(tracks)
}

impl AnimationFormat for TevColorAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1brk1";
    const SECTION_MAGIC: [u8; 4] = *b"TRK1";
    const SECTION_NAME: &'static str = "TRK1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::SVR1;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        s.skip(1)?;
        let duration = s.read_u16()?;
        let counts = [s.read_u16()?, s.read_u16()?];
        let mut pool_counts = [[0u16; 4]; 2];
        for count in pool_counts.iter_mut().flatten() {
            *count = s.read_u16()?;
        }
        let mut offsets = [0u32; 6];
        for offset in &mut offsets {
            *offset = s.read_u32()?;
        }
        let mut pool_offsets = [[0u32; 4]; 2];
        for offset in pool_offsets.iter_mut().flatten() {
            *offset = s.read_u32()?;
        }

        let mut tangent_type = TangentType::In;
        let [register, constant] = [0, 1].map(|bank| Bank {
            count: counts[bank],
            table: offsets[bank],
            index: offsets[2 + bank],
            names: offsets[4 + bank],
            pool_counts: pool_counts[bank],
            pool_offsets: pool_offsets[bank],
        });
        let register = read_bank(s, &register, &mut tangent_type)?;
        let constant = read_bank(s, &constant, &mut tangent_type)?;

        debug!(
            register = register.len(),
            constant = constant.len(),
            "decoded TEV color animation"
        );
        Ok(Self {
            loop_mode,
            duration,
            tangent_type,
            register,
            constant,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_u8(0xFF)?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.register.len(), "register color tracks")?)?;
        s.write_u16(to_u16(self.constant.len(), "constant color tracks")?)?;
        let mut count_slots = [[0u64; 4]; 2];
        for slot in count_slots.iter_mut().flatten() {
            *slot = s.reserve_u16()?;
        }
        let mut offset_slots = [0u64; 6];
        for slot in &mut offset_slots {
            *slot = s.reserve_u32()?;
        }
        let mut pool_slots = [[0u64; 4]; 2];
        for slot in pool_slots.iter_mut().flatten() {
            *slot = s.reserve_u32()?;
        }
        s.pad(32, Padding::Text)?;

        let banks = [&self.register, &self.constant];
        let mut pools = [color_pools(), color_pools()];

        for (bank, tracks) in banks.iter().enumerate() {
            s.fill_offset(offset_slots[bank])?;
            for track in tracks.iter() {
                for entry in encode_color_track(track, &mut pools[bank], self.tangent_type)? {
                    entry.write(s)?;
                }
                s.write_u8(track.register_index)?;
                s.write_bytes(&[0xFF; 3])?;
            }
            s.pad(4, Padding::Text)?;
        }

        for (bank, bank_pools) in pools.iter().enumerate() {
            for (i, pool) in bank_pools.iter().enumerate() {
                s.patch_u16(count_slots[bank][i], pool.count()?)?;
                s.fill_offset(pool_slots[bank][i])?;
                pool.write(s)?;
                s.pad(4, Padding::Text)?;
            }
        }

        for (bank, tracks) in banks.iter().enumerate() {
            s.fill_offset(offset_slots[2 + bank])?;
            write_index_table(s, tracks.len())?;
        }

        for (bank, tracks) in banks.iter().enumerate() {
            s.fill_offset(offset_slots[4 + bank])?;
            let names: Vec<&str> = tracks.iter().map(|t| t.name.as_str()).collect();
            write_string_table(s, &names)?;
            s.pad(4, Padding::Text)?;
        }

        s.pad(32, Padding::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::keyframe::Interpolation;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn sample() -> TevColorAnimation {
        let mut anim = TevColorAnimation::new(LoopMode::Loop, 60);
        anim.tangent_type = TangentType::InOut;
        let pulse = Channel::from_points(&[(0.0, 0.0), (30.0, 255.0), (60.0, 0.0)], Interpolation::Smooth);
        let mut glow = ColorTrack::new(
            "mat_glow",
            [pulse.clone(), Channel::constant(128.0), pulse, Channel::constant(255.0)],
        );
        glow.register_index = 1;
        anim.register = vec![glow];
        anim.constant = vec![
            ColorTrack::new("mat_eye", std::array::from_fn(|_| Channel::constant(-64.0))),
            ColorTrack::new("mat_body", std::array::from_fn(|_| Channel::constant(255.0))),
        ];
        anim
    }

    #[test]
    fn test_round_trip() {
        let anim = sample();
        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1brk1");
        assert_eq!(&bytes[0x10..0x14], b"SVR1");

        let decoded = TevColorAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_tables_start_at_0x80() {
        let bytes = sample().to_bytes().unwrap();
        let register_table = u32::from_be_bytes(bytes[0x40..0x44].try_into().unwrap());
        assert_eq!(register_table + 0x20, 0x80);
    }

    #[test]
    fn test_index_mismatch_is_integrity_violation() {
        let mut bytes = sample().to_bytes().unwrap();
        // constant index table: offset stored at section + 0x24
        let index_offset = u32::from_be_bytes(bytes[0x4C..0x50].try_into().unwrap()) as usize + 0x20;
        bytes[index_offset + 3] = 7;
        let err = TevColorAnimation::from_bytes(&bytes).unwrap_err();
        assert!(err.is_integrity_violation(), "{err}");
        assert!(matches!(err, Error::IntegrityViolation { .. }));
    }
}
