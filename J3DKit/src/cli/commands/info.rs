//! CLI command for file summaries

use std::path::Path;

use anyhow::Context;

use super::format_size;
use crate::anim::{Animation, HeaderTag};
use crate::archive::Archive;
use crate::asset::{self, Asset};
use crate::compression;

fn print_animation(anim: &Animation) {
    println!("Format: {}", anim.kind());
    println!("Loop mode: {:?}", anim.loop_mode());
    println!("Duration: {} frames", anim.duration());
    println!("Entries: {}", anim.entity_count());
    let tag = anim.tag();
    if tag != HeaderTag::BLANK {
        println!("Header tag: {}", String::from_utf8_lossy(&tag.0).trim_end_matches('\u{FFFD}'));
    }
}

fn print_archive(archive: &Archive) {
    let dirs = archive.root.walk();
    println!("Format: RARC archive");
    println!("Root: {}", archive.root.name);
    println!("Directories: {}", dirs.len());
    println!("Files: {}", archive.root.file_count());
    println!(
        "Total size: {} ({} bytes)",
        format_size(archive.root.total_size()),
        archive.root.total_size()
    );
}

/// Decode any supported file and print a summary
pub fn execute(source: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;

    println!("File: {}", source.display());
    println!("Size: {}", format_size(data.len() as u64));
    if compression::is_compressed(&data) {
        let raw = compression::yaz0::decompressed_size(&data)?;
        println!("Yaz0: {} decompressed", format_size(raw as u64));
    }

    match asset::decode(&data)? {
        Asset::Animation(anim) => print_animation(&anim),
        Asset::Archive(archive) => print_archive(&archive),
    }
    Ok(())
}
