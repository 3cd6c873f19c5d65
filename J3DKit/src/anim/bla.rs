//! `bla` sampled cluster animations (`CLF1`)

use tracing::debug;

use super::LoopMode;
use super::codec::{AnimationFormat, HeaderTag, SampledEntry, SectionReader, SectionWriter, encode_sampled, sampled_values};
use super::pool::{PoolFormat, ValuePool, read_pool};
use crate::binary::{Padding, to_u16};
use crate::error::Result;

/// A cluster weight animation sampled once per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledClusterAnimation {
    pub loop_mode: LoopMode,
    /// Byte following the loop mode, preserved verbatim.
    pub filler: u8,
    pub duration: u16,
    pub clusters: Vec<Vec<f32>>,
    pub tag: HeaderTag,
}

impl SampledClusterAnimation {
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

impl AnimationFormat for SampledClusterAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1bla1";
    const SECTION_MAGIC: [u8; 4] = *b"CLF1";
    const SECTION_NAME: &'static str = "CLF1";
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
        let pool = read_pool(s, start, usize::from(pool_count), PoolFormat::F32)?;

        s.seek_to(table_offset)?;
        let mut clusters = Vec::with_capacity(usize::from(cluster_count));
        for _ in 0..cluster_count {
            let entry = SampledEntry::read(s)?;
            clusters.push(sampled_values(&pool, entry, 1.0));
        }

        debug!(clusters = clusters.len(), "decoded sampled cluster animation");
        Ok(Self {
            loop_mode,
            filler,
            duration,
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

        let mut pool = ValuePool::new("weight", PoolFormat::F32);
        s.fill_offset(table_slot)?;
        for cluster in &self.clusters {
            encode_sampled(cluster, &mut pool, 1.0)?.write(s)?;
        }
        s.pad(32, Padding::Text)?;

        s.patch_u16(count_slot, pool.count()?)?;
        s.fill_offset(pool_slot)?;
        pool.write(s)?;
        s.pad(32, Padding::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let mut anim = SampledClusterAnimation::new(LoopMode::MirrorLoop, 4);
        anim.clusters = vec![vec![0.0, 0.25, 0.5, 0.75], vec![1.0], vec![0.25, 0.5]];

        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1bla1");
        // the third sequence reuses the tail of the first
        assert_eq!(u16::from_be_bytes([bytes[0x2E], bytes[0x2F]]), 5);

        let decoded = SampledClusterAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }
}
