//! Yaz0 run-length/LZ compression
//!
//! A 16-byte header (`"Yaz0"`, decompressed size, 8 reserved bytes) is
//! followed by groups of up to eight tokens. Each group starts with a code
//! byte whose bits, most significant first, mark a token as a literal byte
//! (1) or a back-reference (0). A back-reference is two bytes
//! `NNNN DDDD DDDD DDDD` copying `N + 2` bytes from distance `D + 1`, or,
//! when `N` is zero, three bytes with the count `0x12 +` the third byte.

use tracing::debug;

use crate::binary::{ARCHIVE_PAD_FILL, BinaryReader, BinaryWriter, Padding, to_u32};
use crate::error::{Error, Result};

/// Magic at the start of every Yaz0 stream.
pub const MAGIC: [u8; 4] = *b"Yaz0";

/// Size of the stream header.
pub const HEADER_SIZE: usize = 0x10;

/// Largest distance a back-reference can encode.
pub const MAX_SEARCH_DEPTH: usize = 0x1000;

/// Longest run a back-reference can encode.
pub const MAX_RUN_LENGTH: usize = 0xFF + 0x12;

const MIN_MATCH: usize = 3;
const SHORT_RUN_LIMIT: usize = 0x12;

/// Options for Yaz0 compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Yaz0Options {
    /// How many bytes back to search for matches (at most [`MAX_SEARCH_DEPTH`]).
    pub search_depth: usize,
    /// Pad the output to a multiple of 0x20 bytes.
    pub align: bool,
}

impl Default for Yaz0Options {
    fn default() -> Self {
        Self {
            search_depth: MAX_SEARCH_DEPTH,
            align: false,
        }
    }
}

impl Yaz0Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search window, clamped to [`MAX_SEARCH_DEPTH`]. Smaller windows
    /// compress faster and worse.
    #[must_use]
    pub fn with_search_depth(mut self, depth: usize) -> Self {
        self.search_depth = depth.min(MAX_SEARCH_DEPTH);
        self
    }

    #[must_use]
    pub fn with_align(mut self, align: bool) -> Self {
        self.align = align;
        self
    }
}

/// Whether `data` carries the Yaz0 magic.
#[must_use]
pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&MAGIC)
}

/// Decompressed size stored in the header.
pub fn decompressed_size(data: &[u8]) -> Result<usize> {
    let mut reader = BinaryReader::new(data).with_section("Yaz0 header");
    let magic: [u8; 4] = reader.read_array()?;
    if magic != MAGIC {
        return Err(Error::unrecognized_magic(data));
    }
    Ok(reader.read_u32()? as usize)
}

/// Output capacity to reserve up front: the stored size, but never more than
/// the payload could expand to.
fn output_capacity(size: usize, stream_len: usize) -> usize {
    size.min(stream_len.saturating_sub(HEADER_SIZE).saturating_mul(MAX_RUN_LENGTH))
}

/// Decompress a Yaz0 stream.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedMagic`] without the Yaz0 magic,
/// [`Error::TruncatedData`] if the stream ends before the stored size is
/// produced and [`Error::DecompressionError`] for a back-reference reaching
/// before the start of the output.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let size = decompressed_size(data)?;
    let mut reader = BinaryReader::new(data).with_section("Yaz0 stream");
    reader.seek(HEADER_SIZE as u64)?;

    let mut out: Vec<u8> = Vec::with_capacity(output_capacity(size, data.len()));
    while out.len() < size {
        let code = reader.read_u8()?;
        for bit in 0..8 {
            if out.len() >= size {
                break;
            }
            if code & (0x80 >> bit) != 0 {
                out.push(reader.read_u8()?);
                continue;
            }

            let token_offset = reader.position();
            let info = reader.read_u16()?;
            let distance = usize::from(info & 0x0FFF) + 1;
            let count = match info >> 12 {
                0 => usize::from(reader.read_u8()?) + SHORT_RUN_LIMIT,
                n => usize::from(n) + 2,
            };
            if distance > out.len() {
                return Err(Error::DecompressionError(format!(
                    "Yaz0 back-reference at {token_offset:#x} reaches {distance} bytes back with only {} written",
                    out.len()
                )));
            }

            let count = count.min(size - out.len());
            // Byte by byte: source and destination may overlap.
            for _ in 0..count {
                let byte = out[out.len() - distance];
                out.push(byte);
            }
        }
    }

    debug!(compressed = data.len(), decompressed = size, "Yaz0 decompressed");
    Ok(out)
}

/// A back-reference candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    len: usize,
    pos: usize,
}

/// Match finder with one token of look-ahead.
///
/// When the match starting one byte later is at least two bytes longer, the
/// current byte is emitted as a literal and the later match is held for the
/// next call.
#[derive(Debug)]
pub struct Yaz0Encoder<'a> {
    data: &'a [u8],
    search_depth: usize,
    pending: Option<Match>,
}

impl<'a> Yaz0Encoder<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], search_depth: usize) -> Self {
        Self {
            data,
            search_depth: search_depth.min(MAX_SEARCH_DEPTH),
            pending: None,
        }
    }

    /// Longest earlier match for the bytes at `offset`, preferring the
    /// earliest position among equal lengths.
    fn longest_match(&self, offset: usize) -> Match {
        let mut best = Match { len: 0, pos: 0 };
        if offset >= self.data.len() {
            return best;
        }
        let limit = (self.data.len() - offset).min(MAX_RUN_LENGTH);
        let start = offset.saturating_sub(self.search_depth);

        for pos in start..offset {
            let len = self.data[pos..]
                .iter()
                .zip(&self.data[offset..offset + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if len > best.len {
                best = Match { len, pos };
                if len == limit {
                    break;
                }
            }
        }
        best
    }

    fn next_match(&mut self, offset: usize) -> Match {
        if let Some(pending) = self.pending.take() {
            return pending;
        }

        let current = self.longest_match(offset);
        if current.len >= MIN_MATCH {
            let next = self.longest_match(offset + 1);
            if next.len >= current.len + 2 {
                self.pending = Some(next);
                return Match { len: 1, pos: 0 };
            }
        }
        current
    }

    /// Encode the whole input into a token stream, without the header.
    pub fn encode(mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + self.data.len() / 8 + 1);
        let mut group: Vec<u8> = Vec::with_capacity(24);
        let mut code = 0u8;
        let mut tokens = 0;
        let mut offset = 0;

        while offset < self.data.len() {
            let found = self.next_match(offset);
            if found.len < MIN_MATCH {
                group.push(self.data[offset]);
                code |= 0x80 >> tokens;
                offset += 1;
            } else {
                let distance = offset - found.pos - 1;
                if found.len >= SHORT_RUN_LIMIT {
                    group.push((distance >> 8) as u8);
                    group.push((distance & 0xFF) as u8);
                    group.push((found.len - SHORT_RUN_LIMIT) as u8);
                } else {
                    group.push((((found.len - 2) << 4) | ((distance >> 8) & 0x0F)) as u8);
                    group.push((distance & 0xFF) as u8);
                }
                offset += found.len;
            }

            tokens += 1;
            if tokens == 8 {
                out.push(code);
                out.append(&mut group);
                code = 0;
                tokens = 0;
            }
        }

        // A stream ending on a full group carries one empty code byte.
        out.push(code);
        out.append(&mut group);
        out
    }
}

/// Compress `data` with explicit options.
///
/// # Errors
/// Returns [`Error::TooManyEntries`] if the input does not fit the 32-bit
/// size field.
pub fn compress_with(data: &[u8], options: &Yaz0Options) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    writer.write_bytes(&MAGIC)?;
    writer.write_u32(to_u32(data.len() as u64, "Yaz0 input bytes")?)?;
    writer.write_fill(0, 8)?;
    writer.write_bytes(&Yaz0Encoder::new(data, options.search_depth).encode())?;
    if options.align {
        writer.pad(0x20, Padding::Byte(ARCHIVE_PAD_FILL))?;
    }

    debug!(
        decompressed = data.len(),
        compressed = writer.position(),
        depth = options.search_depth,
        "Yaz0 compressed"
    );
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(size: u32) -> Vec<u8> {
        let mut out = b"Yaz0".to_vec();
        out.extend(size.to_be_bytes());
        out.extend([0u8; 8]);
        out
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_F491u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn test_known_stream() {
        let mut expected = header(6);
        expected.extend([0xE0, b'a', b'b', b'c', 0x10, 0x02]);

        let compressed = compress_with(b"abcabc", &Yaz0Options::default()).unwrap();
        assert_eq!(compressed, expected);
        assert_eq!(decompress(&expected).unwrap(), b"abcabc");
    }

    #[test]
    fn test_overlapping_copy() {
        let mut stream = header(10);
        stream.extend([0x80, b'a', 0x70, 0x00]);
        assert_eq!(decompress(&stream).unwrap(), vec![b'a'; 10]);
        assert_eq!(compress_with(&[b'a'; 10], &Yaz0Options::default()).unwrap(), stream);
    }

    #[test]
    fn test_long_run_round_trip() {
        let data: Vec<u8> = std::iter::repeat_n(0u8, 0x400)
            .chain(b"J3D1bck1".iter().copied())
            .chain(std::iter::repeat_n(0xFFu8, 0x300))
            .collect();
        let compressed = compress_with(&data, &Yaz0Options::default()).unwrap();
        assert!(compressed.len() < data.len() / 10);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_noise_round_trip() {
        let data = noise(3000);
        let options = Yaz0Options::new().with_search_depth(0x200);
        assert_eq!(decompress(&compress_with(&data, &options).unwrap()).unwrap(), data);
    }

    #[test]
    fn test_full_group_gets_trailing_code() {
        let compressed = compress_with(b"01234567", &Yaz0Options::default()).unwrap();
        assert_eq!(compressed.len(), HEADER_SIZE + 1 + 8 + 1);
        assert_eq!(compressed.last(), Some(&0));
        assert_eq!(decompress(&compressed).unwrap(), b"01234567");
    }

    #[test]
    fn test_empty_input() {
        let compressed = compress_with(&[], &Yaz0Options::default()).unwrap();
        assert!(decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_align() {
        let options = Yaz0Options::new().with_align(true);
        let compressed = compress_with(b"abcabc", &options).unwrap();
        assert_eq!(compressed.len() % 0x20, 0);
        assert_eq!(decompress(&compressed).unwrap(), b"abcabc");
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = compress_with(b"abcabc", &Yaz0Options::default()).unwrap();
        let err = decompress(&compressed[..compressed.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::TruncatedData { .. }));
    }

    #[test]
    fn test_oversized_header_is_truncation() {
        let mut stream = header(u32::MAX);
        stream.extend([0xFF, b'a', b'b']);
        assert_eq!(output_capacity(u32::MAX as usize, stream.len()), 3 * MAX_RUN_LENGTH);
        assert_eq!(output_capacity(4, stream.len()), 4);
        assert!(matches!(decompress(&stream), Err(Error::TruncatedData { .. })));
    }

    #[test]
    fn test_reference_before_start() {
        let mut stream = header(4);
        stream.extend([0x00, 0x10, 0x05]);
        assert!(matches!(decompress(&stream), Err(Error::DecompressionError(_))));
    }

    #[test]
    fn test_rejects_missing_magic() {
        let err = decompress(b"RARC\0\0\0\0").unwrap_err();
        assert!(err.is_unrecognized_format());
        assert!(!is_compressed(b"Yaz"));
    }
}
