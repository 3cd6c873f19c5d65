//! Big-endian cursor utilities shared by every codec
//!
//! [`BinaryReader`] walks an immutable byte slice and reports reads past the
//! end as [`Error::TruncatedData`] labelled with the structure being read.
//! [`BinaryWriter`] appends to a growable buffer and supports the
//! placeholder-then-backfill pattern used for counts, sizes and offsets.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Fill text written into J3D animation alignment gaps.
pub const PADDING_TEXT: &[u8] = b"This is padding data to alignment.....";

/// Fill byte written into archive alignment gaps.
pub const ARCHIVE_PAD_FILL: u8 = 0x00;

/// Content used to fill alignment gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Repeat [`PADDING_TEXT`], restarting at its first byte on every call.
    Text,
    /// Repeat a single byte.
    Byte(u8),
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
#[must_use]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    (value + (alignment - 1)) & !(alignment - 1)
}

/// Bounds-checked big-endian reader over a byte slice.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
    section: &'static str,
}

impl<'a> BinaryReader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            section: "data",
        }
    }

    /// Set the label reported by truncation errors.
    #[must_use]
    pub fn with_section(mut self, section: &'static str) -> Self {
        self.section = section;
        self
    }

    /// Change the label reported by truncation errors.
    pub fn set_section(&mut self, section: &'static str) {
        self.section = section;
    }

    /// The underlying buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.cursor.get_ref()
    }

    /// Total buffer length.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Current absolute position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Build the truncation error for a read at `offset`.
    #[must_use]
    pub fn truncated_at(&self, offset: u64) -> Error {
        Error::TruncatedData {
            section: self.section,
            offset,
        }
    }

    /// Build an integrity error for the current section.
    #[must_use]
    pub fn integrity(&self, offset: u64, message: impl Into<String>) -> Error {
        Error::IntegrityViolation {
            section: self.section,
            offset,
            message: message.into(),
        }
    }

    /// Move to an absolute position inside the buffer.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.len() {
            return Err(self.truncated_at(position));
        }
        self.cursor.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Advance the position by `count` bytes.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.seek(self.position() + count)
    }

    fn read_with<T>(
        &mut self,
        read: impl FnOnce(&mut Cursor<&'a [u8]>) -> std::io::Result<T>,
    ) -> Result<T> {
        let offset = self.cursor.position();
        read(&mut self.cursor).map_err(|_| {
            self.cursor.set_position(offset);
            self.truncated_at(offset)
        })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_with(|c| c.read_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_with(|c| c.read_i8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_with(|c| c.read_u16::<BigEndian>())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_with(|c| c.read_i16::<BigEndian>())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_with(|c| c.read_u32::<BigEndian>())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_with(|c| c.read_f32::<BigEndian>())
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.read_with(|c| {
            let mut buf = [0u8; N];
            c.read_exact(&mut buf)?;
            Ok(buf)
        })
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let start = self.position();
        let data = self.data();
        let begin = usize::try_from(start).map_err(|_| self.truncated_at(start))?;
        let slice = begin
            .checked_add(count)
            .and_then(|end| data.get(begin..end))
            .ok_or_else(|| self.truncated_at(start))?;
        self.cursor.set_position(start + count as u64);
        Ok(slice)
    }

    /// Borrow the NUL-terminated byte string at an absolute offset without
    /// moving the cursor.
    pub fn cstring_at(&self, offset: u64) -> Result<&'a [u8]> {
        let data = self.data();
        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start <= data.len())
            .ok_or_else(|| self.truncated_at(offset))?;
        let tail = &data[start..];
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.truncated_at(offset))?;
        Ok(&tail[..len])
    }
}

/// Big-endian writer over a growable buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    cursor: Cursor<Vec<u8>>,
}

impl BinaryWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write position (always the end of the buffer).
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Consume the writer and return the buffer.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.cursor.write_u8(value)?;
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.cursor.write_i8(value)?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.cursor.write_u16::<BigEndian>(value)?;
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.cursor.write_i16::<BigEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.cursor.write_u32::<BigEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.cursor.write_f32::<BigEndian>(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.write_all(bytes)?;
        Ok(())
    }

    /// Write `count` copies of `byte`.
    pub fn write_fill(&mut self, byte: u8, count: usize) -> Result<()> {
        self.write_bytes(&vec![byte; count])
    }

    /// Fill up to the next multiple of `alignment`.
    pub fn pad(&mut self, alignment: u64, padding: Padding) -> Result<()> {
        let gap = (align_up(self.position(), alignment) - self.position()) as usize;
        match padding {
            Padding::Text => {
                let fill: Vec<u8> = PADDING_TEXT.iter().copied().cycle().take(gap).collect();
                self.write_bytes(&fill)
            }
            Padding::Byte(byte) => self.write_fill(byte, gap),
        }
    }

    /// Overwrite a big-endian `u16` at an earlier position.
    pub fn patch_u16(&mut self, at: u64, value: u16) -> Result<()> {
        let end = self.cursor.position();
        self.cursor.seek(SeekFrom::Start(at))?;
        self.cursor.write_u16::<BigEndian>(value)?;
        self.cursor.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    /// Overwrite a big-endian `u32` at an earlier position.
    pub fn patch_u32(&mut self, at: u64, value: u32) -> Result<()> {
        let end = self.cursor.position();
        self.cursor.seek(SeekFrom::Start(at))?;
        self.cursor.write_u32::<BigEndian>(value)?;
        self.cursor.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

/// Narrow a length or offset to `u16`, failing with [`Error::TooManyEntries`].
pub(crate) fn to_u16(value: usize, what: &'static str) -> Result<u16> {
    value
        .try_into()
        .map_err(|_| Error::TooManyEntries { what, count: value })
}

/// Narrow a length or offset to `u32`, failing with [`Error::TooManyEntries`].
pub(crate) fn to_u32(value: u64, what: &'static str) -> Result<u32> {
    value.try_into().map_err(|_| Error::TooManyEntries {
        what,
        count: value as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_past_end_reports_offset() {
        let data = [0x12, 0x34, 0x56];
        let mut reader = BinaryReader::new(&data).with_section("test");
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        match reader.read_u16() {
            Err(Error::TruncatedData { section, offset }) => {
                assert_eq!(section, "test");
                assert_eq!(offset, 2);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_cstring_at() {
        let data = b"ab\0cd\0";
        let reader = BinaryReader::new(data);
        assert_eq!(reader.cstring_at(0).unwrap(), b"ab");
        assert_eq!(reader.cstring_at(3).unwrap(), b"cd");
        assert!(reader.cstring_at(7).is_err());
    }

    #[test]
    fn test_text_padding_restarts() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(1).unwrap();
        writer.pad(4, Padding::Text).unwrap();
        writer.write_u8(2).unwrap();
        writer.pad(8, Padding::Text).unwrap();
        assert_eq!(writer.into_inner(), b"\x01Thi\x02Thi".to_vec());
    }

    #[test]
    fn test_pad_noop_when_aligned() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(0).unwrap();
        writer.pad(4, Padding::Byte(0xAA)).unwrap();
        assert_eq!(writer.position(), 4);
    }

    #[test]
    fn test_patch_keeps_position() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(0xFFFF_FFFF).unwrap();
        writer.write_u16(7).unwrap();
        writer.patch_u32(0, 0x0102_0304).unwrap();
        writer.write_u8(9).unwrap();
        assert_eq!(writer.into_inner(), vec![1, 2, 3, 4, 0, 7, 9]);
    }
}
