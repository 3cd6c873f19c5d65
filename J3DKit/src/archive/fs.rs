//! Import archives from and extract them to the filesystem

use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::{Archive, ArchiveFile, Directory};
use crate::error::{Error, Result};

fn entry_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidPath(path.display().to_string()))
}

fn subdir_mut<'a>(mut dir: &'a mut Directory, parts: &[String]) -> Option<&'a mut Directory> {
    for part in parts {
        dir = dir.subdirs.get_mut(part)?;
    }
    Some(dir)
}

/// Reject names that would escape the extraction directory.
fn checked_name(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidPath(name.to_string()));
    }
    Ok(name)
}

impl Archive {
    /// Build an archive from a directory. The directory becomes the root.
    ///
    /// Entries are added sorted by file name. Symbolic links are skipped.
    pub fn from_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base = path.as_ref();
        if !base.is_dir() {
            return Err(Error::InvalidPath(format!(
                "{} is not a directory",
                base.display()
            )));
        }
        info!("Importing directory: {:?}", base);

        let mut archive = Archive::new(entry_name(base)?);
        for entry in WalkDir::new(base)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!("Skipping symlink {:?}", entry.path());
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(base)
                .map_err(|e| Error::InvalidPath(e.to_string()))?;
            let mut parts = relative
                .iter()
                .map(|part| {
                    part.to_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::InvalidPath(relative.display().to_string()))
                })
                .collect::<Result<Vec<_>>>()?;
            let Some(name) = parts.pop() else {
                continue;
            };
            let parent = subdir_mut(&mut archive.root, &parts)
                .ok_or_else(|| Error::InvalidPath(relative.display().to_string()))?;

            if file_type.is_dir() {
                parent.insert_dir(Directory::new(name));
            } else if file_type.is_file() {
                let data = std::fs::read(entry.path())?;
                parent.insert_file(ArchiveFile::new(name, data));
            }
        }

        debug!(
            files = archive.root.file_count(),
            bytes = archive.root.total_size(),
            "imported directory"
        );
        Ok(archive)
    }

    /// Write every file to `path/<root name>/...`, creating directories as
    /// needed.
    pub fn extract_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let base = path.as_ref();
        for (dir_path, dir) in self.root.walk() {
            let mut target = base.to_path_buf();
            for part in dir_path.split('/') {
                target.push(checked_name(part)?);
            }
            std::fs::create_dir_all(&target)?;
            for file in dir.files.values() {
                std::fs::write(target.join(checked_name(&file.name)?), &file.data)?;
            }
        }
        info!(
            "Extracted {} files to {:?}",
            self.root.file_count(),
            base.join(&self.root.name)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::sample;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_from_dir_sorts_entries() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("stage");
        std::fs::create_dir_all(root.join("b_dir")).unwrap();
        std::fs::create_dir_all(root.join("a_dir")).unwrap();
        std::fs::write(root.join("z.bin"), b"z").unwrap();
        std::fs::write(root.join("m.bin"), b"m").unwrap();
        std::fs::write(root.join("a_dir/inner.bck"), b"J3D1").unwrap();

        let archive = Archive::from_dir(&root).unwrap();
        assert_eq!(archive.root.name, "stage");
        let files: Vec<&String> = archive.root.files.keys().collect();
        assert_eq!(files, vec!["m.bin", "z.bin"]);
        let dirs: Vec<&String> = archive.root.subdirs.keys().collect();
        assert_eq!(dirs, vec!["a_dir", "b_dir"]);
        assert_eq!(archive.root.file("a_dir/inner.bck").unwrap().data, b"J3D1");
    }

    #[test]
    fn test_from_dir_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.bin");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(Archive::from_dir(&file), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_extract_writes_tree() {
        let temp = TempDir::new().unwrap();
        sample().extract_to(temp.path()).unwrap();

        let root = temp.path().join("scene");
        assert_eq!(std::fs::read(root.join("scene.bin")).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read(root.join("map/pollution/H_ma_rak.bmp")).unwrap(), b"BMP");
        assert!(root.join("empty").is_dir());
    }

    #[test]
    fn test_extract_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let mut archive = Archive::new("root");
        archive.root.insert_file(ArchiveFile::new("..", b"oops".to_vec()));
        assert!(matches!(archive.extract_to(temp.path()), Err(Error::InvalidPath(_))));
    }
}
