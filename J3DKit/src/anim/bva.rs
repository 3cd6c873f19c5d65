//! `bva` mesh visibility animations (`VAF1`)
//!
//! One show/hide flag per frame for each mesh. Flag sequences share a
//! deduplicated byte table.

use tracing::debug;

use super::LoopMode;
use super::codec::{AnimationFormat, HeaderTag, SectionReader, SectionWriter};
use super::pool::find_sequence;
use crate::binary::{Padding, to_u16};
use crate::error::Result;

/// A mesh visibility animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityAnimation {
    pub loop_mode: LoopMode,
    pub duration: u16,
    /// Visibility per frame, one sequence per mesh.
    pub meshes: Vec<Vec<bool>>,
    pub tag: HeaderTag,
}

impl VisibilityAnimation {
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

impl AnimationFormat for VisibilityAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1bva1";
    const SECTION_MAGIC: [u8; 4] = *b"VAF1";
    const SECTION_NAME: &'static str = "VAF1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::BLANK;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        s.skip(1)?;
        let duration = s.read_u16()?;
        let mesh_count = s.read_u16()?;
        let table_count = s.read_u16()?;
        let entries_offset = s.read_u32()?;
        let table_offset = s.read_u32()?;

        s.seek_to(table_offset)?;
        let table = s.read_bytes(usize::from(table_count))?;

        s.seek_to(entries_offset)?;
        let mut meshes = Vec::with_capacity(usize::from(mesh_count));
        for _ in 0..mesh_count {
            let at = s.position();
            let count = usize::from(s.read_u16()?);
            let offset = usize::from(s.read_u16()?);
            let flags = table
                .get(offset..offset + count)
                .ok_or_else(|| s.integrity(at, format!("show range {offset}+{count} exceeds table of {table_count}")))?;
            meshes.push(flags.iter().map(|&flag| flag != 0).collect());
        }

        debug!(meshes = meshes.len(), "decoded visibility animation");
        Ok(Self {
            loop_mode,
            duration,
            meshes,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_u8(0xFF)?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.meshes.len(), "meshes")?)?;
        let count_slot = s.reserve_u16()?;
        let entries_slot = s.reserve_u32()?;
        let table_slot = s.reserve_u32()?;
        s.pad(32, Padding::Text)?;

        let mut table: Vec<u8> = Vec::new();
        s.fill_offset(entries_slot)?;
        for mesh in &self.meshes {
            let flags: Vec<u8> = mesh.iter().map(|&shown| u8::from(shown)).collect();
            let offset = match find_sequence(&table, &flags) {
                Some(offset) => offset,
                None => {
                    table.extend_from_slice(&flags);
                    table.len() - flags.len()
                }
            };
            s.write_u16(to_u16(flags.len(), "visibility frames")?)?;
            s.write_u16(to_u16(offset, "show table")?)?;
        }
        s.pad(4, Padding::Text)?;

        s.patch_u16(count_slot, to_u16(table.len(), "show table")?)?;
        s.fill_offset(table_slot)?;
        s.write_bytes(&table)?;
        s.pad(4, Padding::Text)?;
        s.pad(32, Padding::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn sample() -> VisibilityAnimation {
        let mut anim = VisibilityAnimation::new(LoopMode::Once, 4);
        anim.meshes = vec![
            vec![true, true, false, false],
            vec![true, false],
            vec![false, false, true, true],
        ];
        anim
    }

    #[test]
    fn test_round_trip() {
        let anim = sample();
        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1bva1");

        let decoded = VisibilityAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_show_table_shared() {
        let bytes = sample().to_bytes().unwrap();
        // [1,1,0,0] then [1,0] found inside it, then [0,0,1,1] overlaps nothing
        assert_eq!(u16::from_be_bytes([bytes[0x2E], bytes[0x2F]]), 8);
        let entries = u32::from_be_bytes(bytes[0x30..0x34].try_into().unwrap()) as usize + 0x20;
        assert_eq!(entries, 0x40);
        assert_eq!(&bytes[entries + 4..entries + 8], &[0, 2, 0, 1]);
    }

    #[test]
    fn test_range_past_table() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0x41] = 20;
        let err = VisibilityAnimation::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::IntegrityViolation { .. }));
    }
}
