//! Compression utilities
//!
//! Archives and some animation files ship Yaz0-compressed (`.szs`). The
//! functions here dispatch to [`yaz0`] with default options.

pub mod yaz0;

use crate::error::Result;

pub use yaz0::{Yaz0Encoder, Yaz0Options};

/// Whether `data` carries the Yaz0 magic.
#[must_use]
pub fn is_compressed(data: &[u8]) -> bool {
    yaz0::is_compressed(data)
}

/// Compress data using Yaz0 with the default search depth.
///
/// # Errors
/// Returns an error if the input is larger than a 32-bit size field can hold.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    yaz0::compress_with(data, &Yaz0Options::default())
}

/// Decompress Yaz0 data.
///
/// # Errors
/// Returns an error if the header is missing or the stream is malformed.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    yaz0::decompress(data)
}
