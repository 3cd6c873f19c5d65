//! `btp` texture pattern animations (`TPT1`)
//!
//! Each material swaps the texture bound to one texture map slot, one
//! texture index per frame. Index sequences are deduplicated into a shared
//! `u16` bank.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LoopMode;
use super::brk::read_names;
use super::codec::{AnimationFormat, HeaderTag, SectionReader, SectionWriter};
use super::pool::find_sequence;
use crate::binary::{Padding, to_u16};
use crate::error::Result;
use crate::formats::common::write_string_table;

/// Texture index sequence of one material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TexturePatternTrack {
    /// Material name.
    pub name: String,
    /// Texture map slot whose texture is swapped.
    pub texmap_index: u8,
    /// Material index from the remap table.
    pub material_index: u16,
    /// Texture index per frame.
    pub frames: Vec<u16>,
}

impl TexturePatternTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, frames: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            texmap_index: 0,
            material_index: 0,
            frames,
        }
    }
}

/// A texture pattern animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TexturePatternAnimation {
    pub loop_mode: LoopMode,
    pub duration: u16,
    /// Header word following the entry count, preserved verbatim.
    pub unknown: u16,
    pub materials: Vec<TexturePatternTrack>,
    pub tag: HeaderTag,
}

impl TexturePatternAnimation {
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

impl AnimationFormat for TexturePatternAnimation {
    const FILE_MAGIC: [u8; 8] = *b"J3D1btp1";
    const SECTION_MAGIC: [u8; 4] = *b"TPT1";
    const SECTION_NAME: &'static str = "TPT1";
    const DEFAULT_TAG: HeaderTag = HeaderTag::BLANK;

    fn tag(&self) -> HeaderTag {
        self.tag
    }

    fn read_section(s: &mut SectionReader<'_>) -> Result<Self> {
        let loop_mode = LoopMode::try_from(s.read_u8()?)?;
        s.skip(1)?;
        let duration = s.read_u16()?;
        let count = s.read_u16()?;
        let unknown = s.read_u16()?;
        let entries_offset = s.read_u32()?;
        let bank_offset = s.read_u32()?;
        let remap_offset = s.read_u32()?;
        let names_offset = s.read_u32()?;

        s.seek_to(entries_offset)?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let length = s.read_u16()?;
            let start = s.read_u16()?;
            let texmap_index = s.read_u8()?;
            s.skip(3)?;
            entries.push((length, start, texmap_index));
        }

        s.seek_to(remap_offset)?;
        let mut remap = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            remap.push(s.read_u16()?);
        }

        let names_start = s.absolute(names_offset);
        let names = read_names(s, names_start, count)?;

        let bank_start = s.absolute(bank_offset);
        let mut materials = Vec::with_capacity(usize::from(count));
        for ((name, (length, start, texmap_index)), material_index) in names.into_iter().zip(entries).zip(remap) {
            s.seek(bank_start + 2 * u64::from(start))?;
            let mut frames = Vec::with_capacity(usize::from(length));
            for _ in 0..length {
                frames.push(s.read_u16()?);
            }
            materials.push(TexturePatternTrack {
                name,
                texmap_index,
                material_index,
                frames,
            });
        }

        debug!(materials = materials.len(), "decoded texture pattern animation");
        Ok(Self {
            loop_mode,
            duration,
            unknown,
            materials,
            tag: s.tag(),
        })
    }

    fn write_section(&self, s: &mut SectionWriter) -> Result<()> {
        s.write_u8(self.loop_mode as u8)?;
        s.write_u8(0xFF)?;
        s.write_u16(self.duration)?;
        s.write_u16(to_u16(self.materials.len(), "texture pattern tracks")?)?;
        s.write_u16(self.unknown)?;
        let entries_slot = s.reserve_u32()?;
        let bank_slot = s.reserve_u32()?;
        let remap_slot = s.reserve_u32()?;
        let names_slot = s.reserve_u32()?;

        let mut bank: Vec<u16> = Vec::new();
        let mut offsets = Vec::with_capacity(self.materials.len());
        for material in &self.materials {
            let offset = match find_sequence(&bank, &material.frames) {
                Some(offset) => offset,
                None => {
                    bank.extend_from_slice(&material.frames);
                    bank.len() - material.frames.len()
                }
            };
            offsets.push(to_u16(offset, "texture index bank")?);
        }

        s.fill_offset(entries_slot)?;
        for (material, offset) in self.materials.iter().zip(offsets) {
            s.write_u16(to_u16(material.frames.len(), "texture pattern frames")?)?;
            s.write_u16(offset)?;
            s.write_u8(material.texmap_index)?;
            s.write_u8(0xFF)?;
            s.write_u16(0xFFFF)?;
        }
        s.pad(4, Padding::Text)?;

        s.fill_offset(bank_slot)?;
        for &index in &bank {
            s.write_u16(index)?;
        }
        s.pad(4, Padding::Text)?;

        s.fill_offset(remap_slot)?;
        for material in &self.materials {
            s.write_u16(material.material_index)?;
        }
        s.pad(4, Padding::Text)?;

        s.fill_offset(names_slot)?;
        let names: Vec<&str> = self.materials.iter().map(|m| m.name.as_str()).collect();
        write_string_table(s, &names)?;
        s.pad(32, Padding::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> TexturePatternAnimation {
        let mut anim = TexturePatternAnimation::new(LoopMode::Loop, 6);
        anim.unknown = 1;
        let mut eyes = TexturePatternTrack::new("mat_eye_l", vec![0, 0, 1, 2, 1, 0]);
        eyes.texmap_index = 1;
        let mut right = TexturePatternTrack::new("mat_eye_r", vec![1, 2, 1]);
        right.material_index = 1;
        anim.materials = vec![eyes, right];
        anim
    }

    #[test]
    fn test_round_trip() {
        let anim = sample();
        let bytes = anim.to_bytes().unwrap();
        assert_eq!(&bytes[..8], b"J3D1btp1");
        assert_eq!(&bytes[0x10..0x20], &[0xFF; 16]);

        let decoded = TexturePatternAnimation::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, anim);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_bank_reuses_subsequence() {
        let bytes = sample().to_bytes().unwrap();
        // entries start right after the header
        let entries = u32::from_be_bytes(bytes[0x30..0x34].try_into().unwrap()) as usize + 0x20;
        assert_eq!(entries, 0x40);
        let second_offset = u16::from_be_bytes([bytes[entries + 10], bytes[entries + 11]]);
        assert_eq!(second_offset, 2);

        let bank = u32::from_be_bytes(bytes[0x34..0x38].try_into().unwrap()) as usize + 0x20;
        let remap = u32::from_be_bytes(bytes[0x38..0x3C].try_into().unwrap()) as usize + 0x20;
        assert_eq!(remap - bank, 12);
    }
}
