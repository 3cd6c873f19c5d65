//! Error types for `J3DKit`

use thiserror::Error;

/// The error type for `J3DKit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A read ran past the end of the buffer.
    #[error("truncated data in {section} at offset {offset:#x}")]
    TruncatedData {
        /// Label of the structure being read when the data ran out.
        section: &'static str,
        /// Absolute offset of the failed read.
        offset: u64,
    },

    // ==================== Format Recognition Errors ====================
    /// The 8-byte magic does not name any supported format.
    #[error("unrecognized magic: {}", String::from_utf8_lossy(.0))]
    UnrecognizedMagic([u8; 8]),

    /// J3D files with more than one section are not supported.
    #[error("unsupported J3D section count: {count} (expected 1)")]
    UnsupportedSectionCount {
        /// The section count found in the header.
        count: u32,
    },

    /// The section magic does not match the file magic.
    #[error("section magic mismatch: expected {}, found {}", String::from_utf8_lossy(.expected), String::from_utf8_lossy(.found))]
    SectionMagicMismatch {
        /// The magic the file type requires.
        expected: [u8; 4],
        /// The magic found in the file.
        found: [u8; 4],
    },

    // ==================== Integrity Errors ====================
    /// A structural invariant of the file is violated.
    #[error("integrity violation in {section} at offset {offset:#x}: {message}")]
    IntegrityViolation {
        /// Label of the structure that failed validation.
        section: &'static str,
        /// Absolute offset of the offending field.
        offset: u64,
        /// Description of what is inconsistent.
        message: String,
    },

    /// The loop mode byte is outside the known range.
    #[error("invalid loop mode: {value}")]
    InvalidLoopMode {
        /// The raw loop mode byte.
        value: u8,
    },

    /// A channel references pool slots past the end of the pool.
    ///
    /// Decoding recovers from this by substituting a default value; the
    /// error only describes the anomaly in the emitted warning.
    #[error("pool access out of range: slot {offset} of {len}")]
    OutOfRangePoolAccess {
        /// The requested pool slot.
        offset: usize,
        /// The pool length.
        len: usize,
    },

    // ==================== Variant Errors ====================
    /// The tangent type is neither 0 (in) nor 1 (in/out).
    #[error("unsupported tangent type: {value}")]
    UnsupportedTangentType {
        /// The raw tangent type.
        value: u16,
    },

    /// No conversion exists between the two formats.
    #[error("no conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source format name.
        from: &'static str,
        /// Target format name.
        to: &'static str,
    },

    // ==================== Encode Errors ====================
    /// A value pool grew past what a 16-bit offset can address.
    #[error("{pool} pool too large: {len} values")]
    PoolOverflow {
        /// Name of the pool.
        pool: &'static str,
        /// Length the pool would have reached.
        len: usize,
    },

    /// A table has more entries than its count field can hold.
    #[error("too many {what}: {count}")]
    TooManyEntries {
        /// What is being counted.
        what: &'static str,
        /// The number of entries.
        count: usize,
    },

    /// A name cannot be represented in Shift-JIS.
    #[error("name cannot be encoded as Shift-JIS: {0}")]
    UnencodableName(String),

    /// An animation table cannot be turned back into an animation.
    #[error("invalid animation table: {0}")]
    InvalidTable(String),

    // ==================== Compression Errors ====================
    /// Decompression failed.
    #[error("decompression failed: {0}")]
    DecompressionError(String),

    // ==================== Path Errors ====================
    /// A path is not usable for the requested operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build [`Error::UnrecognizedMagic`] from the first bytes of `data`,
    /// zero-filled when shorter than eight bytes.
    #[must_use]
    pub fn unrecognized_magic(data: &[u8]) -> Self {
        let mut magic = [0u8; 8];
        let len = data.len().min(8);
        magic[..len].copy_from_slice(&data[..len]);
        Error::UnrecognizedMagic(magic)
    }

    /// Whether the input was not recognized as a supported format at all.
    pub fn is_unrecognized_format(&self) -> bool {
        matches!(
            self,
            Error::UnrecognizedMagic(_)
                | Error::UnsupportedSectionCount { .. }
                | Error::SectionMagicMismatch { .. }
        )
    }

    /// Whether the input was recognized but is structurally inconsistent.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Error::IntegrityViolation { .. } | Error::InvalidLoopMode { .. }
        )
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// Result type alias for `J3DKit` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(Error::UnsupportedSectionCount { count: 2 }.is_unrecognized_format());
        assert!(Error::UnrecognizedMagic(*b"J3D1xyz1").is_unrecognized_format());
        assert!(!Error::InvalidLoopMode { value: 9 }.is_unrecognized_format());
        assert!(Error::InvalidLoopMode { value: 9 }.is_integrity_violation());
    }

    #[test]
    fn test_error_display() {
        let err = Error::TruncatedData { section: "ANK1", offset: 0x40 };
        assert_eq!(err.to_string(), "truncated data in ANK1 at offset 0x40");
        let err = Error::UnrecognizedMagic(*b"J3D1xyz1");
        assert_eq!(err.to_string(), "unrecognized magic: J3D1xyz1");
    }
}
