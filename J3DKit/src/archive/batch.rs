//! Batch archive operations
//!
//! Discovery of archive files in a directory tree and parallel extraction.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use super::Archive;

/// File extensions recognized as archives (`.szs` is Yaz0-wrapped).
pub const ARCHIVE_EXTENSIONS: [&str; 3] = ["arc", "szs", "rarc"];

/// Progress information during batch operations
#[derive(Debug, Clone)]
pub struct ArchiveProgress {
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current file being processed (if applicable)
    pub current_file: Option<String>,
}

impl ArchiveProgress {
    #[must_use]
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file name
    #[must_use]
    pub fn with_file(current: usize, total: usize, file: impl Into<String>) -> Self {
        Self {
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Result of a batch archive operation
#[derive(Debug, Clone)]
pub struct BatchArchiveResult {
    /// Number of successful operations
    pub success_count: usize,
    /// Number of failed operations
    pub fail_count: usize,
    /// Messages for each file processed
    pub results: Vec<String>,
}

/// Find all archive files in a directory recursively
///
/// # Returns
/// A sorted list of paths with one of the [`ARCHIVE_EXTENSIONS`].
pub fn find_archive_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut archives: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    ARCHIVE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    archives.sort();
    archives
}

fn extract_one(archive_path: &Path, dest: &Path) -> crate::error::Result<()> {
    let data = std::fs::read(archive_path)?;
    Archive::from_bytes(&data)?.extract_to(dest)
}

/// Batch extract archives in parallel
///
/// Each archive is extracted into a folder named after the archive file
/// (without extension), placed at the archive's path relative to
/// `source_base` under `dest_base`.
///
/// # Arguments
/// * `archive_files` - List of archives to extract
/// * `source_base` - Base directory of the source (for calculating relative paths)
/// * `dest_base` - Destination directory for extracted files
/// * `progress` - Callback for progress updates
pub fn batch_extract<F>(
    archive_files: &[PathBuf],
    source_base: &Path,
    dest_base: &Path,
    progress: F,
) -> BatchArchiveResult
where
    F: Fn(&ArchiveProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = archive_files.len();

    let results: Vec<String> = archive_files
        .par_iter()
        .map(|archive_path| {
            let relative_path = archive_path
                .strip_prefix(source_base)
                .unwrap_or(archive_path.as_path());
            let display_path = relative_path.to_string_lossy();

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&ArchiveProgress::with_file(
                current,
                total,
                display_path.to_string(),
            ));

            let relative_parent = relative_path.parent().unwrap_or(Path::new(""));
            let stem = archive_path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let archive_dest = dest_base.join(relative_parent).join(&stem);

            if let Err(e) = std::fs::create_dir_all(&archive_dest) {
                fail_counter.fetch_add(1, Ordering::SeqCst);
                return format!("Failed to create folder for {display_path}: {e}");
            }

            match extract_one(archive_path, &archive_dest) {
                Ok(()) => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Extracted: {display_path}")
                }
                Err(e) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Failed {display_path}: {e}")
                }
            }
        })
        .collect();

    BatchArchiveResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        results,
    }
}
