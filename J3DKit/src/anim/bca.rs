//! `bca` sampled joint animations (`ANF1`)
//!
//! Same pool layout as `bck`, but every channel is a plain value per frame
//! with no times or tangents. Rotations always use angle scale 0; the byte
//! where `bck` keeps its angle scale is an unused filler here.

use tracing::debug;

use super::codec::{
    AnimationFormat, HeaderTag, SampledEntry, SectionReader, SectionWriter, TRANSFORM_SLOTS,
    encode_sampled, sampled_values,
};
use super::keyframe::rotation_scale;
use super::pool::{PoolFormat, ValuePool, read_pool};
use super::{LoopMode, Transform};
use crate::binary::{Padding, to_u16};
use crate::error::Result;

/// Filler byte written after the loop mode.
pub const DEFAULT_FILLER: u8 = 0xFF;

/// A joint animation sampled once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledJointAnimation {
    pub loop_mode: LoopMode,
    pub filler: u8,
    pub duration: u16,
    /// One transform per joint. Rotations are in degrees.
    pub joints: Vec<Transform<Vec<f32>>>,
    pub tag: HeaderTag,
}

impl Default for SampledJointAnimation {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::default(),
            filler: DEFAULT_FILLER,
            duration: 0,
            joints: Vec::new(),
            tag: Self::DEFAULT_TAG,
        }
    }
}

impl SampledJointAnimation {
    #[must_use]
    pub fn new(loop_mode: LoopMode, duration: u16) -> Self {
        Self {
            loop_mode,
            duration,
            ..Self::default()
        }
    }
}

const POOL_FORMATS: [PoolFormat; 3] = [PoolFormat::F32, PoolFormat::S16, PoolFormat::F32];

impl AnimationFormat for SampledJointAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1bca1";
    const SECTION_MAGIC: [u8; 4] = *b"ANF1";
    const SECTION_NAME: &'static str = "ANF1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::BLANK;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        let filler = s.read_u8()?;
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

        let scales = [1.0, rotation_scale(0), 1.0];
        s.seek_to(table_offset)?;
        let mut joints = Vec::with_capacity(usize::from(joint_count));
        for _ in 0..joint_count {
            let mut entries = [SampledEntry::default(); 9];
            for entry in &mut entries {
                *entry = SampledEntry::read(s)?;
            }
            let channels = std::array::from_fn(|i| {
                let pool = TRANSFORM_SLOTS[i];
                sampled_values(&pools[pool], entries[i], scales[pool])
            });
            joints.push(Transform::from_slots(channels));
        }

        debug!(joints = joints.len(), "decoded sampled joint animation");
        Ok(Self {
            loop_mode,
            filler,
            duration,
            joints,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_u8(self.filler)?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.joints.len(), "joints")?)?;
        let count_slots = [s.reserve_u16()?, s.reserve_u16()?, s.reserve_u16()?];
        let table_slot = s.reserve_u32()?;
        let offset_slots = [s.reserve_u32()?, s.reserve_u32()?, s.reserve_u32()?];
        s.pad(32, Padding::Text)?;

        let mut pools = [
            ValuePool::new("scale", PoolFormat::F32),
            ValuePool::new("rotation", PoolFormat::S16),
            ValuePool::new("translation", PoolFormat::F32),
        ];
        let scales = [1.0, rotation_scale(0), 1.0];

        s.fill_offset(table_slot)?;
        for joint in &self.joints {
            for (values, &pool) in joint.slots().into_iter().zip(&TRANSFORM_SLOTS) {
                encode_sampled(values, &mut pools[pool], scales[pool])?.write(s)?;
            }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let mut anim = SampledJointAnimation::new(LoopMode::Loop, 4);
        let mut joint = Transform::from_components(std::array::from_fn(|_| vec![0.0]));
        joint.scale = [vec![1.0], vec![1.0, 1.5, 2.0, 1.5], vec![1.0]];
        joint.rotation[1] = vec![0.0, 45.0, 90.0, 45.0];
        joint.translation = [vec![0.25; 4], vec![-3.0], vec![0.0, 1.0, 2.0, 3.0]];
        anim.joints = vec![joint.clone(), joint];

        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1bca1");
        let decoded = SampledJointAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_shared_sequences_are_deduplicated() {
        let mut anim = SampledJointAnimation::new(LoopMode::Once, 3);
        let joint = Transform::from_components(std::array::from_fn(|_| vec![1.0, 2.0, 3.0]));
        anim.joints = vec![joint.clone(), joint];
        let bytes = anim.to_bytes().unwrap();
        let scale_count = u16::from_be_bytes([bytes[0x2E], bytes[0x2F]]);
        assert_eq!(scale_count, 3);
    }
}
