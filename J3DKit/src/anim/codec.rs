//! Shared J3D file and section engine
//!
//! Every animation file is a 0x20-byte J3D header followed by exactly one
//! section:
//!
//! ```text
//! 0x00  magic        "J3D1" + 4-byte type
//! 0x08  file size    u32
//! 0x0C  section count u32 (always 1)
//! 0x10  tag          16 bytes, preserved verbatim
//! 0x20  section magic, section size u32, body...
//! ```
//!
//! Offsets inside the body are relative to the section start. Variants only
//! describe their body; this module owns the header, the size backfill and
//! the channel table records shared by all keyed and sampled formats.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keyframe::{Channel, Keyframe, TangentType, pool_value};
use super::pool::ValuePool;
use crate::binary::{BinaryReader, BinaryWriter, to_u32};
use crate::error::{Error, Result};

/// Offset of the section inside every J3D file.
pub const SECTION_START: u64 = 0x20;

/// The 16 header bytes following the section count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderTag(pub [u8; 16]);

impl HeaderTag {
    /// All bytes `0xFF`.
    pub const BLANK: Self = Self([0xFF; 16]);
    /// `"SVR1"` followed by twelve `0xFF` bytes.
    pub const SVR1: Self = Self(*b"SVR1\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF");
}

impl Default for HeaderTag {
    fn default() -> Self {
        Self::BLANK
    }
}

/// A single-section J3D animation format.
pub trait AnimationFormat: Sized {
    /// The full 8-byte file magic.
    const FILE_MAGIC: [u8; 8];
    /// The 4-byte section magic.
    const SECTION_MAGIC: [u8; 4];
    /// Section name used in log output and error labels.
    const SECTION_NAME: &'static str;
    /// Tag written for newly built animations.
    const DEFAULT_TAG: HeaderTag;

    /// The header tag to write.
    fn tag(&self) -> HeaderTag;

    /// Decode the section body.
    fn read_section(section: &mut SectionReader<'_>) -> Result<Self>;

    /// Encode the section body.
    fn write_section(&self, section: &mut SectionWriter) -> Result<()>;

    /// Append data after the section. The section size is final by now and
    /// the file size is backfilled afterwards.
    fn write_trailer(&self, _writer: &mut BinaryWriter) -> Result<()> {
        Ok(())
    }

    /// Decode a complete file of this format.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        decode(data)
    }

    /// Encode a complete file of this format.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }
}

/// Reader positioned inside a section, resolving section-relative offsets.
pub struct SectionReader<'a> {
    reader: BinaryReader<'a>,
    start: u64,
    tag: HeaderTag,
}

impl<'a> SectionReader<'a> {
    /// The header tag of the file being read.
    #[must_use]
    pub fn tag(&self) -> HeaderTag {
        self.tag
    }

    /// Absolute position of a section-relative offset.
    #[must_use]
    pub fn absolute(&self, offset: u32) -> u64 {
        self.start + u64::from(offset)
    }

    /// Seek to a section-relative offset.
    pub fn seek_to(&mut self, offset: u32) -> Result<()> {
        let position = self.absolute(offset);
        self.reader.seek(position)
    }
}

impl<'a> Deref for SectionReader<'a> {
    type Target = BinaryReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl DerefMut for SectionReader<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.reader
    }
}

/// Writer for a section body with helpers for section-relative offsets.
pub struct SectionWriter {
    writer: BinaryWriter,
    start: u64,
}

impl SectionWriter {
    /// Current position relative to the section start.
    pub fn offset(&self) -> Result<u32> {
        to_u32(self.writer.position() - self.start, "section size")
    }

    /// Write a zero `u16` placeholder and return its position.
    pub fn reserve_u16(&mut self) -> Result<u64> {
        let at = self.writer.position();
        self.writer.write_u16(0)?;
        Ok(at)
    }

    /// Write a zero `u32` placeholder and return its position.
    pub fn reserve_u32(&mut self) -> Result<u64> {
        let at = self.writer.position();
        self.writer.write_u32(0)?;
        Ok(at)
    }

    /// Backfill an offset placeholder with the current section-relative offset.
    pub fn fill_offset(&mut self, slot: u64) -> Result<()> {
        let offset = self.offset()?;
        self.writer.patch_u32(slot, offset)
    }
}

impl Deref for SectionWriter {
    type Target = BinaryWriter;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl DerefMut for SectionWriter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}

/// Decode a complete animation file.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedMagic`] if the file magic belongs to another
/// format, [`Error::UnsupportedSectionCount`] if the file has more than one
/// section and [`Error::TruncatedData`] if the data ends early.
pub fn decode<A: AnimationFormat>(data: &[u8]) -> Result<A> {
    let mut reader = BinaryReader::new(data).with_section("J3D header");

    let magic: [u8; 8] = reader.read_array()?;
    if magic != A::FILE_MAGIC {
        return Err(Error::UnrecognizedMagic(magic));
    }
    let file_size = reader.read_u32()?;
    let count = reader.read_u32()?;
    if count != 1 {
        return Err(Error::UnsupportedSectionCount { count });
    }
    let tag = HeaderTag(reader.read_array()?);

    let start = reader.position();
    let section_magic: [u8; 4] = reader.read_array()?;
    if section_magic != A::SECTION_MAGIC {
        return Err(Error::SectionMagicMismatch {
            expected: A::SECTION_MAGIC,
            found: section_magic,
        });
    }
    let section_size = reader.read_u32()?;
    debug!(
        section = A::SECTION_NAME,
        file_size, section_size, "decoding animation section"
    );

    reader.set_section(A::SECTION_NAME);
    let mut section = SectionReader { reader, start, tag };
    A::read_section(&mut section)
}

/// Encode a complete animation file.
pub fn encode<A: AnimationFormat>(animation: &A) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    writer.write_bytes(&A::FILE_MAGIC)?;
    writer.write_u32(0)?;
    writer.write_u32(1)?;
    writer.write_bytes(&animation.tag().0)?;

    let start = writer.position();
    writer.write_bytes(&A::SECTION_MAGIC)?;
    writer.write_u32(0)?;

    let mut section = SectionWriter { writer, start };
    animation.write_section(&mut section)?;
    let section_size = section.offset()?;
    let mut writer = section.writer;
    writer.patch_u32(start + 4, section_size)?;

    animation.write_trailer(&mut writer)?;
    let file_size = to_u32(writer.position(), "file size")?;
    writer.patch_u32(8, file_size)?;

    debug!(
        section = A::SECTION_NAME,
        file_size, section_size, "encoded animation section"
    );
    Ok(writer.into_inner())
}

// ==================== Channel tables ====================

/// Pool index of each slot of a 9-channel transform group.
pub const TRANSFORM_SLOTS: [usize; 9] = [0, 1, 2, 0, 1, 2, 0, 1, 2];
/// Pool index of each slot of an RGBA group.
pub const COLOR_SLOTS: [usize; 4] = [0, 1, 2, 3];
/// A single channel drawing from the only pool.
pub const SINGLE_SLOT: [usize; 1] = [0];

/// `(count, offset, tangent type)` record of a keyed channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyedEntry {
    pub count: u16,
    pub offset: u16,
    pub tangent_type: u16,
}

impl KeyedEntry {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            count: reader.read_u16()?,
            offset: reader.read_u16()?,
            tangent_type: reader.read_u16()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u16(self.count)?;
        writer.write_u16(self.offset)?;
        writer.write_u16(self.tangent_type)
    }
}

/// `(count, offset)` record of a sampled channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampledEntry {
    pub count: u16,
    pub offset: u16,
}

impl SampledEntry {
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            count: reader.read_u16()?,
            offset: reader.read_u16()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u16(self.count)?;
        writer.write_u16(self.offset)
    }
}

/// Pool sequence of a keyed channel with value and tangents divided by `scale`.
fn keyed_sequence(channel: &Channel, tangent_type: TangentType, scale: f32) -> Vec<f32> {
    if let [key] = channel.keys.as_slice() {
        return vec![key.value / scale];
    }

    let mut sequence = Vec::with_capacity(channel.keys.len() * tangent_type.slots());
    for key in &channel.keys {
        sequence.push(key.time);
        sequence.push(key.value / scale);
        sequence.push(key.tangent_in / scale);
        if tangent_type == TangentType::InOut {
            sequence.push(key.tangent_out / scale);
        }
    }
    sequence
}

/// Place one entity's keyed channels into their pools.
///
/// `slots[i]` names the pool of channel `i`, and `scales` holds one divisor
/// per pool.
pub fn encode_keyed<const N: usize>(
    channels: [&Channel; N],
    slots: &[usize; N],
    pools: &mut [ValuePool],
    scales: &[f32],
    tangent_type: TangentType,
) -> Result<[KeyedEntry; N]> {
    let mut entries = [KeyedEntry::default(); N];
    for ((entry, channel), &pool) in entries.iter_mut().zip(channels).zip(slots) {
        let sequence = keyed_sequence(channel, tangent_type, scales[pool]);
        entry.offset = pools[pool].insert(&sequence)?;
        entry.count = u16::try_from(channel.keys.len()).map_err(|_| Error::TooManyEntries {
            what: "keyframes",
            count: channel.keys.len(),
        })?;
        entry.tangent_type = tangent_type as u16;
    }
    Ok(entries)
}

/// Read `N` keyed channel records at the current position and decode them
/// against already loaded pools.
///
/// `tangent_type` is raised to the widest tangent type seen. Single-key
/// channels store only a value, so an unknown tag on them is ignored.
pub fn read_keyed<const N: usize>(
    reader: &mut BinaryReader<'_>,
    slots: &[usize; N],
    pools: &[Vec<f32>],
    scales: &[f32],
    tangent_type: &mut TangentType,
) -> Result<[Channel; N]> {
    let mut entries = [(KeyedEntry::default(), TangentType::In); N];
    for entry in &mut entries {
        let raw = KeyedEntry::read(reader)?;
        let kind = match TangentType::try_from(raw.tangent_type) {
            Ok(kind) => kind,
            Err(_) if raw.count <= 1 => {
                debug!(tag = raw.tangent_type, "ignoring tangent type of single-key channel");
                *entry = (raw, TangentType::In);
                continue;
            }
            Err(err) => return Err(err),
        };
        *tangent_type = (*tangent_type).max(kind);
        *entry = (raw, kind);
    }

    Ok(std::array::from_fn(|i| {
        let (entry, kind) = entries[i];
        let pool = slots[i];
        keyed_channel(&pools[pool], entry, kind, scales[pool])
    }))
}

/// Decode one keyed channel from its record.
pub fn keyed_channel(pool: &[f32], entry: KeyedEntry, tangent_type: TangentType, scale: f32) -> Channel {
    let count = usize::from(entry.count);
    let offset = usize::from(entry.offset);
    let keys: Vec<Keyframe> = (0..count)
        .map(|index| Keyframe::from_pool(pool, offset, index, count, tangent_type).scaled(scale))
        .collect();
    Channel::from_decoded(keys)
}

/// Place a sampled channel's values (divided by `scale`) into its pool.
pub fn encode_sampled(values: &[f32], pool: &mut ValuePool, scale: f32) -> Result<SampledEntry> {
    let sequence: Vec<f32> = values.iter().map(|v| v / scale).collect();
    Ok(SampledEntry {
        offset: pool.insert(&sequence)?,
        count: u16::try_from(values.len()).map_err(|_| Error::TooManyEntries {
            what: "samples",
            count: values.len(),
        })?,
    })
}

/// Decode a sampled channel's values (multiplied by `scale`).
pub fn sampled_values(pool: &[f32], entry: SampledEntry, scale: f32) -> Vec<f32> {
    let offset = usize::from(entry.offset);
    (0..usize::from(entry.count))
        .map(|i| pool_value(pool, offset + i) * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::keyframe::Interpolation;
    use crate::anim::pool::PoolFormat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyed_sequence_layouts() {
        let single = Channel::constant(4.0);
        assert_eq!(keyed_sequence(&single, TangentType::InOut, 2.0), vec![2.0]);

        let channel = Channel::new(
            vec![
                Keyframe::with_tangents(0.0, 2.0, 4.0, 6.0),
                Keyframe::with_tangents(8.0, 10.0, 0.0, 2.0),
            ],
            Interpolation::Linear,
        );
        assert_eq!(
            keyed_sequence(&channel, TangentType::In, 2.0),
            vec![0.0, 1.0, 2.0, 8.0, 5.0, 0.0]
        );
        assert_eq!(
            keyed_sequence(&channel, TangentType::InOut, 1.0),
            vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 0.0, 2.0]
        );
    }

    #[test]
    fn test_keyed_round_trip_through_pools() {
        let x = Channel::from_points(&[(0.0, 1.0), (10.0, 3.0)], Interpolation::Linear);
        let y = Channel::constant(5.0);
        let mut pools = vec![ValuePool::new("a", PoolFormat::F32)];

        let entries = encode_keyed([&x, &y], &[0, 0], &mut pools, &[1.0], TangentType::InOut).unwrap();
        assert_eq!(entries[0], KeyedEntry { count: 2, offset: 0, tangent_type: 1 });
        assert_eq!(entries[1], KeyedEntry { count: 1, offset: 8, tangent_type: 1 });

        let mut writer = BinaryWriter::new();
        for entry in &entries {
            entry.write(&mut writer).unwrap();
        }
        let bytes = writer.into_inner();
        let mut reader = BinaryReader::new(&bytes);
        let loaded = vec![pools[0].values().to_vec()];
        let mut tangent_type = TangentType::In;
        let [rx, ry] = read_keyed(&mut reader, &[0, 0], &loaded, &[1.0], &mut tangent_type).unwrap();
        assert_eq!(tangent_type, TangentType::InOut);
        assert_eq!(rx, x);
        assert_eq!(ry, y);
    }

    #[test]
    fn test_sampled_values_out_of_range() {
        let pool = [2.0, 3.0];
        let entry = SampledEntry { count: 3, offset: 0 };
        assert_eq!(sampled_values(&pool, entry, 1.0), vec![2.0, 3.0, 1.0]);
    }
}
