//! Deduplicating value pools
//!
//! Encoders append each channel's value sequence to the pool of its kind,
//! reusing an existing occurrence when the exact sequence is already present.

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};

/// Find the lowest offset at which `candidate` occurs contiguously in `pool`.
///
/// Every offset is tried, so overlapping and self-overlapping matches are
/// found. An empty candidate is never found.
pub fn find_sequence<T: PartialEq>(pool: &[T], candidate: &[T]) -> Option<usize> {
    if candidate.is_empty() || candidate.len() > pool.len() {
        return None;
    }
    pool.windows(candidate.len()).position(|window| window == candidate)
}

/// On-disk representation of a pool's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolFormat {
    F32,
    /// Signed 16-bit, truncated toward zero and clamped to `±32767`.
    S16,
    U16,
    U8,
}

impl PoolFormat {
    /// Size of one value in bytes.
    #[must_use]
    pub fn width(self) -> u64 {
        match self {
            PoolFormat::F32 => 4,
            PoolFormat::S16 | PoolFormat::U16 => 2,
            PoolFormat::U8 => 1,
        }
    }

    /// Map a value onto what the format can store.
    #[must_use]
    pub fn quantize(self, value: f32) -> f32 {
        match self {
            PoolFormat::F32 => value,
            PoolFormat::S16 => value.trunc().clamp(-32767.0, 32767.0),
            PoolFormat::U16 => value.trunc().clamp(0.0, 65535.0),
            PoolFormat::U8 => value.trunc().clamp(0.0, 255.0),
        }
    }

    fn read(self, reader: &mut BinaryReader<'_>) -> Result<f32> {
        Ok(match self {
            PoolFormat::F32 => reader.read_f32()?,
            PoolFormat::S16 => f32::from(reader.read_i16()?),
            PoolFormat::U16 => f32::from(reader.read_u16()?),
            PoolFormat::U8 => f32::from(reader.read_u8()?),
        })
    }

    fn write(self, writer: &mut BinaryWriter, value: f32) -> Result<()> {
        match self {
            PoolFormat::F32 => writer.write_f32(value),
            PoolFormat::S16 => writer.write_i16(value as i16),
            PoolFormat::U16 => writer.write_u16(value as u16),
            PoolFormat::U8 => writer.write_u8(value as u8),
        }
    }
}

/// Read `count` values of `format` starting at absolute offset `start`.
pub fn read_pool(
    reader: &mut BinaryReader<'_>,
    start: u64,
    count: usize,
    format: PoolFormat,
) -> Result<Vec<f32>> {
    reader.seek(start)?;
    (0..count).map(|_| format.read(reader)).collect()
}

/// Append-only pool that stores each distinct sequence once.
#[derive(Debug, Clone)]
pub struct ValuePool {
    name: &'static str,
    format: PoolFormat,
    values: Vec<f32>,
}

impl ValuePool {
    #[must_use]
    pub fn new(name: &'static str, format: PoolFormat) -> Self {
        Self {
            name,
            format,
            values: Vec::new(),
        }
    }

    /// Place `sequence` in the pool and return its offset.
    ///
    /// Values are quantized to the pool format before matching, so two
    /// sequences that store identically share one slot range. An empty
    /// sequence is placed at offset 0 without touching the pool.
    pub fn insert(&mut self, sequence: &[f32]) -> Result<u16> {
        if sequence.is_empty() {
            return Ok(0);
        }

        let stored: Vec<f32> = sequence.iter().map(|&v| self.format.quantize(v)).collect();
        let offset = match find_sequence(&self.values, &stored) {
            Some(offset) => offset,
            None => {
                let offset = self.values.len();
                self.values.extend_from_slice(&stored);
                offset
            }
        };

        u16::try_from(offset).map_err(|_| Error::PoolOverflow {
            pool: self.name,
            len: self.values.len(),
        })
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pool length as the 16-bit count stored in headers.
    pub fn count(&self) -> Result<u16> {
        u16::try_from(self.values.len()).map_err(|_| Error::PoolOverflow {
            pool: self.name,
            len: self.values.len(),
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        for &value in &self.values {
            self.format.write(writer, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_sequence_lowest_offset() {
        let pool = [1, 2, 3, 1, 2, 3];
        assert_eq!(find_sequence(&pool, &[1, 2, 3]), Some(0));
        assert_eq!(find_sequence(&pool, &[3, 1]), Some(2));
        assert_eq!(find_sequence(&pool, &[2, 4]), None);
    }

    #[test]
    fn test_find_sequence_after_partial_match() {
        // The first candidate start fails midway; the real match begins inside it.
        let pool = [1, 1, 2];
        assert_eq!(find_sequence(&pool, &[1, 2]), Some(1));
    }

    #[test]
    fn test_find_sequence_not_found_is_distinct_from_zero() {
        let pool = [5, 6];
        assert_eq!(find_sequence(&pool, &[5]), Some(0));
        assert_eq!(find_sequence::<i32>(&pool, &[]), None);
        assert_eq!(find_sequence(&pool, &[5, 6, 7]), None);
    }

    #[test]
    fn test_insert_reuses_sequences() {
        let mut pool = ValuePool::new("test", PoolFormat::F32);
        assert_eq!(pool.insert(&[1.0, 2.0, 3.0]).unwrap(), 0);
        assert_eq!(pool.insert(&[2.0, 3.0]).unwrap(), 1);
        assert_eq!(pool.insert(&[3.0, 4.0]).unwrap(), 3);
        assert_eq!(pool.values(), &[1.0, 2.0, 3.0, 3.0, 4.0]);
    }

    #[test]
    fn test_insert_quantizes_before_matching() {
        let mut pool = ValuePool::new("rotation", PoolFormat::S16);
        assert_eq!(pool.insert(&[12.7, -40000.0]).unwrap(), 0);
        assert_eq!(pool.insert(&[12.2]).unwrap(), 0);
        assert_eq!(pool.values(), &[12.0, -32767.0]);
    }

    #[test]
    fn test_read_write_pool() {
        let mut pool = ValuePool::new("color", PoolFormat::S16);
        pool.insert(&[-1.0, 255.0]).unwrap();
        let mut writer = BinaryWriter::new();
        pool.write(&mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0x00, 0xFF]);

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(read_pool(&mut reader, 0, 2, PoolFormat::S16).unwrap(), vec![-1.0, 255.0]);
    }
}
