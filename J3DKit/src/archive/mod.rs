//! RARC archive container
//!
//! A RARC archive is a tree of directories ("nodes") whose entries point at
//! file payloads or child nodes. Names live in a shared string table and are
//! hashed with [`hash_archive_name`](crate::formats::common::hash_archive_name).
//! Archives are commonly wrapped in Yaz0 (`.szs`).
//!
//! The tree is held as nested [`Directory`] values whose insertion order
//! drives the writer, so decode-then-encode is deterministic.
//!
//! # Example
//!
//! ```no_run
//! use j3dkit::archive::Archive;
//!
//! let archive = Archive::from_bytes(&std::fs::read("mario.szs")?)?;
//! for (path, dir) in archive.root.walk() {
//!     println!("{path}: {} files", dir.files.len());
//! }
//! archive.extract_to("mario_ext")?;
//! # Ok::<(), j3dkit::Error>(())
//! ```

pub mod batch;
pub mod fs;
mod reader;
mod writer;

use indexmap::IndexMap;

use crate::compression;
use crate::error::Result;

pub use batch::{ArchiveProgress, BatchArchiveResult, batch_extract, find_archive_files};

/// Magic at the start of every uncompressed archive.
pub const MAGIC: [u8; 4] = *b"RARC";

/// Entry flags of a file.
pub const FILE_FLAGS: u8 = 0x11;
/// Entry flags of a directory.
pub const DIRECTORY_FLAGS: u8 = 0x02;

/// Identity fields of an entry as read from an archive.
///
/// The writer ignores these and recomputes them from the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOrigin {
    pub id: u16,
    pub hash: u16,
    pub flags: u8,
}

/// A file stored in an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    pub data: Vec<u8>,
    pub origin: Option<EntryOrigin>,
}

impl ArchiveFile {
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            origin: None,
        }
    }
}

/// A directory node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub name: String,
    pub files: IndexMap<String, ArchiveFile>,
    pub subdirs: IndexMap<String, Directory>,
}

impl Directory {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add or replace a file.
    pub fn insert_file(&mut self, file: ArchiveFile) {
        self.files.insert(file.name.clone(), file);
    }

    /// Add or replace a subdirectory.
    pub fn insert_dir(&mut self, dir: Directory) {
        self.subdirs.insert(dir.name.clone(), dir);
    }

    /// Look up a file by a `/`-separated path relative to this directory.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&ArchiveFile> {
        let (dir, name) = match path.rsplit_once('/') {
            Some((dir, name)) => (self.dir(dir)?, name),
            None => (self, path),
        };
        dir.files.get(name)
    }

    /// Look up a subdirectory by a `/`-separated path relative to this directory.
    #[must_use]
    pub fn dir(&self, path: &str) -> Option<&Directory> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self, |dir, part| dir.subdirs.get(part))
    }

    /// Pre-order walk yielding each directory with its `/`-joined path,
    /// starting with this directory under its own name.
    pub fn walk(&self) -> Vec<(String, &Directory)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.name.clone(), self)];
        while let Some((path, dir)) = stack.pop() {
            for child in dir.subdirs.values().rev() {
                stack.push((format!("{path}/{}", child.name), child));
            }
            out.push((path, dir));
        }
        out
    }

    /// Number of files in this directory and below.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.walk().iter().map(|(_, dir)| dir.files.len()).sum()
    }

    /// Total payload size in bytes in this directory and below.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.walk()
            .iter()
            .flat_map(|(_, dir)| dir.files.values())
            .map(|file| file.data.len() as u64)
            .sum()
    }
}

/// An archive: a single named root directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub root: Directory,
}

/// Options for decoding archives.
#[derive(Debug, Clone)]
pub struct ArchiveReadOptions {
    /// Reject entries whose stored name hash disagrees with the name.
    pub verify_hashes: bool,
}

impl Default for ArchiveReadOptions {
    fn default() -> Self {
        Self { verify_hashes: true }
    }
}

impl ArchiveReadOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verify_hashes(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }
}

/// Why decoding left an entry out of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The directory points back at one of its own ancestors.
    Recursive { node_index: u32 },
    /// The directory points at a node already placed elsewhere in the tree.
    SharedNode { node_index: u32 },
    /// An earlier entry of the same directory already has this name.
    DuplicateName,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Recursive { node_index } => write!(f, "points back at ancestor node {node_index}"),
            SkipReason::SharedNode { node_index } => write!(f, "node {node_index} is already in the tree"),
            SkipReason::DuplicateName => write!(f, "name already used in this directory"),
        }
    }
}

/// An entry that was not materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Path the entry would have had.
    pub path: String,
    pub reason: SkipReason,
}

/// A decoded archive plus the anomalies decoding stepped around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArchive {
    pub archive: Archive,
    pub skipped: Vec<SkippedEntry>,
}

impl Archive {
    /// An empty archive whose root has the given name.
    #[must_use]
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: Directory::new(root_name),
        }
    }

    /// Decode an archive, unwrapping Yaz0 first if present.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::parse(data, &ArchiveReadOptions::default())?.archive)
    }

    /// Decode an archive with explicit options, reporting skipped entries.
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedMagic`](crate::Error::UnrecognizedMagic) if the
    /// data is not a RARC archive,
    /// [`IntegrityViolation`](crate::Error::IntegrityViolation) for
    /// out-of-range node or entry references and mismatched name hashes, and
    /// [`TruncatedData`](crate::Error::TruncatedData) if the data ends early.
    pub fn parse(data: &[u8], options: &ArchiveReadOptions) -> Result<ParsedArchive> {
        if compression::is_compressed(data) {
            let raw = compression::decompress(data)?;
            return reader::read_archive(&raw, options);
        }
        reader::read_archive(data, options)
    }

    /// Encode the archive without compression.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::write_archive(self)
    }
}

/// Whether `data` starts with the archive magic.
#[must_use]
pub fn is_archive(data: &[u8]) -> bool {
    data.starts_with(&MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(super) fn sample() -> Archive {
        let mut archive = Archive::new("scene");
        archive.root.insert_file(ArchiveFile::new("scene.bin", vec![1, 2, 3]));
        let mut map = Directory::new("map");
        map.insert_file(ArchiveFile::new("map.bmd", vec![0xAB; 40]));
        let mut pollution = Directory::new("pollution");
        pollution.insert_file(ArchiveFile::new("H_ma_rak.bmp", b"BMP".to_vec()));
        map.insert_dir(pollution);
        archive.root.insert_dir(map);
        archive.root.insert_dir(Directory::new("empty"));
        archive
    }

    #[test]
    fn test_walk_is_pre_order() {
        let archive = sample();
        let paths: Vec<String> = archive.root.walk().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["scene", "scene/map", "scene/map/pollution", "scene/empty"]);
    }

    #[test]
    fn test_lookup() {
        let archive = sample();
        assert_eq!(archive.root.file("map/pollution/H_ma_rak.bmp").unwrap().data, b"BMP");
        assert_eq!(archive.root.file("scene.bin").unwrap().data, vec![1, 2, 3]);
        assert!(archive.root.file("map/missing").is_none());
        assert_eq!(archive.root.file_count(), 3);
        assert_eq!(archive.root.total_size(), 46);
    }
}
