//! `bck` joint animations (`ANK1`)
//!
//! Nine keyed channels per joint drawing from three pools: scales (`f32`),
//! rotations (`s16`, scaled by the angle scale) and translations (`f32`).
//! Files may carry a sound table after the section; its absolute offset is
//! stored in the last four bytes of the header tag.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::codec::{
    AnimationFormat, HeaderTag, SectionReader, SectionWriter, TRANSFORM_SLOTS, encode_keyed,
    read_keyed,
};
use super::keyframe::{Channel, TangentType, rotation_scale};
use super::pool::{PoolFormat, ValuePool, read_pool};
use super::{LoopMode, Transform};
use crate::binary::{BinaryReader, BinaryWriter, Padding, to_u16, to_u32};
use crate::error::Result;

/// Header field holding the absolute sound table offset.
const SOUND_OFFSET_FIELD: u64 = 0x1C;
/// Sound table offset meaning "no sound table".
const NO_SOUND_TABLE: u32 = 0xFFFF_FFFF;
/// Size of one sound table entry.
const SOUND_ENTRY_SIZE: usize = 0x20;

/// A keyed joint animation.
#[derive(Debug, Clone, PartialEq)]
pub struct JointAnimation {
    pub loop_mode: LoopMode,
    /// Rotations are stored in units of `2^angle_scale * 180 / 32768` degrees.
    pub angle_scale: i8,
    pub duration: u16,
    pub tangent_type: TangentType,
    /// One transform per joint, in skeleton order. Rotations are in degrees.
    pub joints: Vec<Transform<Channel>>,
    pub sounds: Vec<SoundEntry>,
    pub tag: HeaderTag,
}

impl Default for JointAnimation {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::default(),
            angle_scale: 0,
            duration: 0,
            tangent_type: TangentType::default(),
            joints: Vec::new(),
            sounds: Vec::new(),
            tag: Self::DEFAULT_TAG,
        }
    }
}

impl JointAnimation {
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

/// A sound cue triggered during a joint animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundEntry {
    pub sound_id: u32,
    pub start_time: f32,
    pub end_time: f32,
    pub coarse_pitch: f32,
    pub flags: u32,
    pub volume: u8,
    pub fine_pitch: u8,
    pub loop_count: u8,
    pub pan: u8,
    pub unknown: u8,
}

impl SoundEntry {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let entry = Self {
            sound_id: reader.read_u32()?,
            start_time: reader.read_f32()?,
            end_time: reader.read_f32()?,
            coarse_pitch: reader.read_f32()?,
            flags: reader.read_u32()?,
            volume: reader.read_u8()?,
            fine_pitch: reader.read_u8()?,
            loop_count: reader.read_u8()?,
            pan: reader.read_u8()?,
            unknown: reader.read_u8()?,
        };
        reader.skip(7)?;
        Ok(entry)
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u32(self.sound_id)?;
        writer.write_f32(self.start_time)?;
        writer.write_f32(self.end_time)?;
        writer.write_f32(self.coarse_pitch)?;
        writer.write_u32(self.flags)?;
        writer.write_u8(self.volume)?;
        writer.write_u8(self.fine_pitch)?;
        writer.write_u8(self.loop_count)?;
        writer.write_u8(self.pan)?;
        writer.write_u8(self.unknown)?;
        writer.write_fill(0, 7)
    }
}

const POOL_FORMATS: [PoolFormat; 3] = [PoolFormat::F32, PoolFormat::S16, PoolFormat::F32];

fn transform_pools() -> [ValuePool; 3] {
    [
        ValuePool::new("scale", PoolFormat::F32),
        ValuePool::new("rotation", PoolFormat::S16),
        ValuePool::new("translation", PoolFormat::F32),
    ]
}

fn read_sound_table(reader: &mut BinaryReader<'_>, offset: u64) -> Result<Vec<SoundEntry>> {
    reader.set_section("sound table");
    reader.seek(offset)?;
    let count = reader.read_u16()?;
    reader.skip(6)?;
    let mut sounds = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        sounds.push(SoundEntry::read(reader)?);
    }
    Ok(sounds)
}

impl AnimationFormat for JointAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1bck1";
    const SECTION_MAGIC: [u8; 4] = *b"ANK1";
    const SECTION_NAME: &'static str = "ANK1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::BLANK;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        let angle_scale = s.read_i8()?;
        let duration = s.read_u16()?;
        let joint_count = s.read_u16()?;
        let counts = [s.read_u16()?, s.read_u16()?, s.read_u16()?];
        let table_offset = s.read_u32()?;
        let offsets = [s.read_u32()?, s.read_u32()?, s.read_u32()?];

        let mut pools = Vec::with_capacity(3);
        for ((count, offset), format) in counts.into_iter().zip(offsets).zip(POOL_FORMATS) {
            let start = s.absolute(offset);
            pools.push(read_pool(s, start, usize::from(count), format)?);
        }

        let scales = [1.0, rotation_scale(angle_scale), 1.0];
        s.seek_to(table_offset)?;
        let mut tangent_type = TangentType::In;
        let mut joints = Vec::with_capacity(usize::from(joint_count));
        for _ in 0..joint_count {
            let slots = read_keyed(s, &TRANSFORM_SLOTS, &pools, &scales, &mut tangent_type)?;
            joints.push(Transform::from_slots(slots));
        }

        let mut tag = s.tag();
        let sound_offset = u32::from_be_bytes([tag.0[12], tag.0[13], tag.0[14], tag.0[15]]);
        let sounds = if sound_offset == NO_SOUND_TABLE {
            Vec::new()
        } else {
            read_sound_table(s, u64::from(sound_offset))?
        };
        tag.0[12..].copy_from_slice(&NO_SOUND_TABLE.to_be_bytes());

        debug!(joints = joints.len(), sounds = sounds.len(), "decoded joint animation");
        Ok(Self {
            loop_mode,
            angle_scale,
            duration,
            tangent_type,
            joints,
            sounds,
            tag,
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_i8(self.angle_scale)?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.joints.len(), "joints")?)?;
        let count_slots = [s.reserve_u16()?, s.reserve_u16()?, s.reserve_u16()?];
        let table_slot = s.reserve_u32()?;
        let offset_slots = [s.reserve_u32()?, s.reserve_u32()?, s.reserve_u32()?];
        s.pad(32, Padding::Text)?;

        let mut pools = transform_pools();
        let scales = [1.0, rotation_scale(self.angle_scale), 1.0];
        let entries = self
            .joints
            .iter()
            .map(|joint| {
                encode_keyed(joint.slots(), &TRANSFORM_SLOTS, &mut pools, &scales, self.tangent_type)
            })
            .collect::<Result<Vec<_>>>()?;

        s.fill_offset(table_slot)?;
        for entry in entries.iter().flatten() {
            entry.write(s)?;
        }
        s.pad(32, Padding::Text)?;

        for ((pool, count_slot), offset_slot) in pools.iter().zip(count_slots).zip(offset_slots) {
            s.patch_u16(count_slot, pool.count()?)?;
            s.fill_offset(offset_slot)?;
            pool.write(s)?;
            s.pad(32, Padding::Text)?;
        }
        Ok(())
    }

    fn write_trailer(&self, writer: &mut BinaryWriter) -> Result<()> {
        if self.sounds.is_empty() {
            return writer.patch_u32(SOUND_OFFSET_FIELD, NO_SOUND_TABLE);
        }

        let offset = to_u32(writer.position(), "sound table offset")?;
        writer.patch_u32(SOUND_OFFSET_FIELD, offset)?;
        writer.write_u16(to_u16(self.sounds.len(), "sound entries")?)?;
        writer.write_u8(0x0C)?;
        writer.write_fill(0, 5)?;
        for sound in &self.sounds {
            sound.write(writer)?;
        }
        writer.write_fill(0, 0x18)?;
        debug!(offset, entries = self.sounds.len(), "wrote sound table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::keyframe::{Interpolation, Keyframe};
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn sample() -> JointAnimation {
        let mut anim = JointAnimation::new(LoopMode::Loop, 1, 30);
        anim.tangent_type = TangentType::InOut;

        let mut root = Transform::from_components(std::array::from_fn(|_| Channel::constant(0.0)));
        root.scale = [Channel::constant(1.0), Channel::constant(1.0), Channel::constant(1.0)];
        // 90 and 45 degrees are whole rotation units at angle scale 1
        root.rotation[1] = Channel::from_points(&[(0.0, 0.0), (15.0, 90.0), (30.0, 0.0)], Interpolation::Smooth);
        root.translation[0] = Channel::from_points(&[(0.0, 0.0), (10.0, 5.0), (30.0, -5.0)], Interpolation::Linear);
        root.translation[2] = Channel::from_points(&[(0.0, -5.5), (30.0, 12.25)], Interpolation::Smooth);

        let mut arm = root.clone();
        arm.rotation[0] = Channel::from_points(&[(0.0, 45.0), (30.0, -45.0)], Interpolation::Smooth);
        anim.joints = vec![root, arm];
        anim
    }

    #[test]
    fn test_round_trip() {
        let anim = sample();
        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1bck1");
        assert_eq!(u32::from_be_bytes(bytes[8..12].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(bytes.len() % 32, 0);

        let decoded = JointAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_single_key_channel_uses_one_slot() {
        let mut anim = JointAnimation::new(LoopMode::Once, 0, 10);
        anim.joints = vec![Transform::from_components(std::array::from_fn(|_| Channel::constant(3.0)))];
        let bytes = anim.to_bytes().unwrap();

        // scale, rotation and translation pools each hold the single value once
        let counts: Vec<u16> = (0..3)
            .map(|i| u16::from_be_bytes([bytes[0x2E + i * 2], bytes[0x2F + i * 2]]))
            .collect();
        assert_eq!(counts, vec![1, 1, 1]);

        let decoded = JointAnimation::from_bytes(&bytes).unwrap();
        let key = decoded.joints[0].scale[0].keys[0];
        assert_eq!(key, Keyframe::new(0.0, 3.0));
    }

    #[test]
    fn test_single_key_ignores_tangent_tag() {
        let mut anim = JointAnimation::new(LoopMode::Once, 0, 10);
        anim.joints = vec![Transform::from_components(std::array::from_fn(|_| Channel::constant(3.0)))];
        let mut bytes = anim.to_bytes().unwrap();

        let table = 0x20 + u32::from_be_bytes(bytes[0x34..0x38].try_into().unwrap()) as usize;
        bytes[table + 4..table + 6].copy_from_slice(&2u16.to_be_bytes());

        let decoded = JointAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.tangent_type, TangentType::In);
        assert_eq!(decoded.joints[0].scale[0].keys, vec![Keyframe::new(0.0, 3.0)]);
    }

    #[test]
    fn test_multi_key_rejects_tangent_tag() {
        let mut bytes = sample().to_bytes().unwrap();
        // joint 0 rotation y is the fifth record and has three keys
        let table = 0x20 + u32::from_be_bytes(bytes[0x34..0x38].try_into().unwrap()) as usize;
        let record = table + 4 * 6;
        assert_eq!(u16::from_be_bytes([bytes[record], bytes[record + 1]]), 3);
        bytes[record + 4..record + 6].copy_from_slice(&2u16.to_be_bytes());

        let err = JointAnimation::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTangentType { value: 2 }));
    }

    #[test]
    fn test_rotation_quantization() {
        let mut anim = JointAnimation::new(LoopMode::Once, 0, 10);
        let mut joint = Transform::from_components(std::array::from_fn(|_| Channel::constant(0.0)));
        joint.rotation[2] = Channel::constant(90.0);
        anim.joints = vec![joint];

        let decoded = JointAnimation::from_bytes(&anim.to_bytes().unwrap()).unwrap();
        let value = decoded.joints[0].rotation[2].keys[0].value;
        assert_eq!(value, 16384.0 * rotation_scale(0));
        assert!((value - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_sound_table() {
        let mut anim = sample();
        anim.sounds = vec![SoundEntry {
            sound_id: 0x1234,
            start_time: 3.0,
            end_time: 9.5,
            coarse_pitch: 1.0,
            flags: 2,
            volume: 127,
            fine_pitch: 0,
            loop_count: 1,
            pan: 64,
            unknown: 0,
        }];
        let bytes = anim.to_bytes().unwrap();

        let section_size = u32::from_be_bytes(bytes[0x24..0x28].try_into().unwrap());
        let sound_offset = u32::from_be_bytes(bytes[0x1C..0x20].try_into().unwrap());
        assert_eq!(sound_offset, 0x20 + section_size);
        assert_eq!(bytes.len(), sound_offset as usize + 8 + SOUND_ENTRY_SIZE + 0x18);

        let decoded = JointAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.sounds, anim.sounds);
        assert_eq!(decoded.tag, HeaderTag::BLANK);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_no_sound_table_marker() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[0x1C..0x20], &[0xFF; 4]);
    }

    #[test]
    fn test_section_count_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0x0F] = 2;
        let err = JointAnimation::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSectionCount { count: 2 }));
    }

    #[test]
    fn test_truncated() {
        let bytes = sample().to_bytes().unwrap();
        let err = JointAnimation::from_bytes(&bytes[..0x50]).unwrap_err();
        assert!(matches!(err, Error::TruncatedData { .. }));
    }
}
