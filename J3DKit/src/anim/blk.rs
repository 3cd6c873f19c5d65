//! `blk` cluster animations (`CLK1`)
//!
//! One keyed weight channel per cluster, all drawing from a single `f32` pool.

use tracing::debug;

use super::LoopMode;
use super::codec::{AnimationFormat, HeaderTag, SINGLE_SLOT, SectionReader, SectionWriter, encode_keyed, read_keyed};
use super::keyframe::{Channel, TangentType};
use super::pool::{PoolFormat, ValuePool, read_pool};
use crate::binary::{Padding, to_u16};
use crate::error::Result;

/// A keyed cluster weight animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAnimation {
    pub loop_mode: LoopMode,
    /// Byte following the loop mode, preserved verbatim.
    pub filler: u8,
    pub duration: u16,
    pub tangent_type: TangentType,
    pub clusters: Vec<Channel>,
    pub tag: HeaderTag,
}

impl ClusterAnimation {
    #[must_use]
    pub fn new(loop_mode: LoopMode, duration: u16) -> Self {
        Self {
            loop_mode,
            duration,
            tag: Self::DEFAULT_TAG,
            ..Self::default()
        }
    }
}

impl AnimationFormat for ClusterAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1blk1";
    const SECTION_MAGIC: [u8; 4] = *b"CLK1";
    const SECTION_NAME: &'static str = "CLK1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::BLANK;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        let filler = s.read_u8()?;
        let duration = s.read_u16()?;
        let cluster_count = s.read_u16()?;
        let pool_count = s.read_u16()?;
        let table_offset = s.read_u32()?;
        let pool_offset = s.read_u32()?;

        let start = s.absolute(pool_offset);
        let pools = [read_pool(s, start, usize::from(pool_count), PoolFormat::F32)?];

        s.seek_to(table_offset)?;
        let mut tangent_type = TangentType::In;
        let mut clusters = Vec::with_capacity(usize::from(cluster_count));
        for _ in 0..cluster_count {
            let [channel] = read_keyed(s, &SINGLE_SLOT, &pools, &[1.0], &mut tangent_type)?;
            clusters.push(channel);
        }

        debug!(clusters = clusters.len(), "decoded cluster animation");
        Ok(Self {
            loop_mode,
            filler,
            duration,
            tangent_type,
            clusters,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_u8(self.filler)?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.clusters.len(), "clusters")?)?;
        let count_slot = s.reserve_u16()?;
        let table_slot = s.reserve_u32()?;
        let pool_slot = s.reserve_u32()?;
        s.pad(32, Padding::Text)?;

        let mut pools = [ValuePool::new("weight", PoolFormat::F32)];
        s.fill_offset(table_slot)?;
        for cluster in &self.clusters {
            let [entry] = encode_keyed([cluster], &SINGLE_SLOT, &mut pools, &[1.0], self.tangent_type)?;
            entry.write(s)?;
        }
        s.pad(32, Padding::Text)?;

        let [pool] = &pools;
        s.patch_u16(count_slot, pool.count()?)?;
        s.fill_offset(pool_slot)?;
        pool.write(s)?;
        s.pad(32, Padding::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::keyframe::Interpolation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let mut anim = ClusterAnimation::new(LoopMode::Loop, 20);
        anim.tangent_type = TangentType::InOut;
        anim.clusters = vec![
            Channel::from_points(&[(0.0, 0.0), (10.0, 1.0), (20.0, 0.0)], Interpolation::Linear),
            Channel::constant(0.5),
            Channel::from_points(&[(0.0, 1.0), (20.0, 0.0)], Interpolation::Smooth),
        ];

        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1blk1");
        assert_eq!(u16::from_be_bytes([bytes[0x2C], bytes[0x2D]]), 3);

        let decoded = ClusterAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_single_key_ignores_tangent_tag() {
        let mut anim = ClusterAnimation::new(LoopMode::Loop, 20);
        anim.tangent_type = TangentType::InOut;
        anim.clusters = vec![
            Channel::constant(0.5),
            Channel::from_points(&[(0.0, 0.0), (20.0, 1.0)], Interpolation::Linear),
        ];
        let mut bytes = anim.to_bytes().unwrap();

        let table = 0x20 + u32::from_be_bytes(bytes[0x30..0x34].try_into().unwrap()) as usize;
        bytes[table + 4..table + 6].copy_from_slice(&7u16.to_be_bytes());

        let decoded = ClusterAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
    }

    #[test]
    fn test_empty_animation() {
        let anim = ClusterAnimation::new(LoopMode::Once, 0);
        let bytes = anim.to_bytes().unwrap();
        let decoded = ClusterAnimation::from_bytes(&bytes).unwrap();
        assert!(decoded.clusters.is_empty());
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }
}
