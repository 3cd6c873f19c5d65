//! CLI commands for Yaz0 compression

use std::path::Path;

use anyhow::Context;

use super::format_size;
use crate::compression::{self, Yaz0Options, yaz0};

/// Compress a file
pub fn compress(source: &Path, destination: &Path, search_depth: usize, align: bool) -> anyhow::Result<()> {
    let data = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    let options = Yaz0Options::new()
        .with_search_depth(search_depth)
        .with_align(align);
    let compressed = yaz0::compress_with(&data, &options)?;
    std::fs::write(destination, &compressed)
        .with_context(|| format!("writing {}", destination.display()))?;

    println!(
        "Compressed {} -> {}",
        format_size(data.len() as u64),
        format_size(compressed.len() as u64)
    );
    Ok(())
}

/// Decompress a file
pub fn decompress(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    let raw = compression::decompress(&data)?;
    std::fs::write(destination, &raw)
        .with_context(|| format!("writing {}", destination.display()))?;

    println!(
        "Decompressed {} -> {}",
        format_size(data.len() as u64),
        format_size(raw.len() as u64)
    );
    Ok(())
}
