//! CLI commands for archive operations

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use walkdir::WalkDir;

use super::format_size;
use crate::archive::{Archive, ArchiveReadOptions, batch_extract, find_archive_files};
use crate::asset::{EncodeOptions, encode_with};
use crate::cli::progress::{DISK, LOOKING_GLASS, PACKAGE, print_done, print_step, simple_bar};

/// `mario.szs` extracts to `mario.szs_ext`.
fn default_extract_dir(source: &Path) -> PathBuf {
    let mut name = source.file_name().map(OsString::from).unwrap_or_default();
    name.push("_ext");
    source.with_file_name(name)
}

/// `mario.szs_ext` packs back to `mario.szs`; any other folder gains an
/// extension.
fn default_pack_path(source: &Path, yaz0: bool) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(stripped) = name.strip_suffix("_ext") {
        return source.with_file_name(stripped);
    }
    let ending = if yaz0 { "szs" } else { "arc" };
    source.with_file_name(format!("{name}.{ending}"))
}

/// The single folder inside `source` that becomes the archive root.
fn root_folder(source: &Path) -> anyhow::Result<PathBuf> {
    let mut folders = WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().to_path_buf());

    let Some(root) = folders.next() else {
        bail!(
            "Directory {} contains no folders! Exactly one folder should exist.",
            source.display()
        );
    };
    if folders.next().is_some() {
        bail!(
            "Directory {} contains multiple folders! Only one folder should exist.",
            source.display()
        );
    }
    Ok(root)
}

/// Extract an archive to a directory
pub fn extract(source: &Path, destination: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let destination = destination.map_or_else(|| default_extract_dir(source), Path::to_path_buf);

    if !quiet {
        print_step(1, 2, LOOKING_GLASS, &format!("Reading {}...", source.display()));
    }
    let data = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    let parsed = Archive::parse(&data, &ArchiveReadOptions::default())?;
    for skipped in &parsed.skipped {
        println!("Skipped {} ({})", skipped.path, skipped.reason);
    }

    let archive = parsed.archive;
    if !quiet {
        print_step(
            2,
            2,
            PACKAGE,
            &format!(
                "Extracting {} files to {}...",
                archive.root.file_count(),
                destination.display()
            ),
        );
    }
    archive.extract_to(&destination)?;

    if !quiet {
        print_done(start.elapsed());
    }
    Ok(())
}

/// Pack a directory into an archive
pub fn pack(source: &Path, destination: Option<&Path>, yaz0: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    if !source.is_dir() {
        bail!("{} is not a directory", source.display());
    }
    let destination = destination.map_or_else(|| default_pack_path(source, yaz0), Path::to_path_buf);
    let root = root_folder(source)?;

    print_step(1, 2, LOOKING_GLASS, &format!("Loading {}...", root.display()));
    let archive = Archive::from_dir(&root)?;

    print_step(2, 2, DISK, &format!("Writing {}...", destination.display()));
    let options = EncodeOptions::new().with_compression(yaz0);
    let bytes = encode_with(&archive.into(), &options)?;
    std::fs::write(&destination, &bytes)
        .with_context(|| format!("writing {}", destination.display()))?;

    println!("Wrote {}", format_size(bytes.len() as u64));
    print_done(start.elapsed());
    Ok(())
}

/// Print the directory tree of an archive
pub fn list(source: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    let archive = Archive::from_bytes(&data)?;

    for (path, dir) in archive.root.walk() {
        println!("{path}/");
        for file in dir.files.values() {
            println!(
                "  {:>10}  {path}/{}",
                format_size(file.data.len() as u64),
                file.name
            );
        }
    }
    println!();
    println!(
        "{} files, {}",
        archive.root.file_count(),
        format_size(archive.root.total_size())
    );
    Ok(())
}

/// Batch extract archives
pub fn batch_extract_cmd(source: &Path, dest: &Path, quiet: bool) -> anyhow::Result<()> {
    let archives = find_archive_files(source);

    if archives.is_empty() {
        println!("No archives found in: {}", source.display());
        return Ok(());
    }

    println!("Found {} archives to extract", archives.len());

    let pb = simple_bar(archives.len() as u64, "Extracting", quiet);
    let result = batch_extract(&archives, source, dest, |progress| {
        pb.set_position(progress.current as u64);
        if let Some(ref name) = progress.current_file {
            pb.set_message(name.clone());
        }
    });
    pb.finish_and_clear();

    println!();
    println!("Extraction complete:");
    println!("  Success: {}", result.success_count);
    println!("  Failed: {}", result.fail_count);

    if result.fail_count > 0 {
        println!();
        println!("Failures:");
        for msg in result.results.iter().filter(|m| m.starts_with("Failed")) {
            println!("  {msg}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_paths() {
        assert_eq!(
            default_extract_dir(Path::new("stage/mario.szs")),
            PathBuf::from("stage/mario.szs_ext")
        );
        assert_eq!(
            default_pack_path(Path::new("stage/mario.szs_ext"), false),
            PathBuf::from("stage/mario.szs")
        );
        assert_eq!(
            default_pack_path(Path::new("stage/scene"), true),
            PathBuf::from("stage/scene.szs")
        );
    }

    #[test]
    fn test_root_folder_requires_exactly_one() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(root_folder(temp.path()).is_err());
        std::fs::create_dir(temp.path().join("scene")).unwrap();
        assert_eq!(root_folder(temp.path()).unwrap(), temp.path().join("scene"));
        std::fs::create_dir(temp.path().join("other")).unwrap();
        assert!(root_folder(temp.path()).is_err());
    }
}
