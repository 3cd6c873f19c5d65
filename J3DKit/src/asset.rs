//! Format-independent entry points
//!
//! [`decode`] identifies a file by its leading magic, unwrapping Yaz0 first,
//! and returns the matching [`Asset`]. [`encode_with`] writes it back,
//! optionally recompressing.

use std::path::Path;

use tracing::debug;

use crate::anim::{Animation, AnimationKind};
use crate::archive::{self, Archive};
use crate::compression::{self, Yaz0Options, yaz0};
use crate::error::{Error, Result};

/// Any decoded file.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Animation(Animation),
    Archive(Archive),
}

/// Format identifier of an [`Asset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Animation(AnimationKind),
    Archive,
}

impl AssetKind {
    /// Identify uncompressed data by its magic.
    #[must_use]
    pub fn from_magic(data: &[u8]) -> Option<Self> {
        if archive::is_archive(data) {
            return Some(AssetKind::Archive);
        }
        AnimationKind::from_magic(data).map(AssetKind::Animation)
    }

    /// Identify a file by extension (case-insensitive). `szs` and `rarc` map
    /// to archives.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        if archive::batch::ARCHIVE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
        {
            return Some(AssetKind::Archive);
        }
        AnimationKind::from_extension(ext).map(AssetKind::Animation)
    }

    /// Canonical lowercase extension of an uncompressed file.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Animation(kind) => kind.extension(),
            AssetKind::Archive => "arc",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl Asset {
    #[must_use]
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Animation(anim) => AssetKind::Animation(anim.kind()),
            Asset::Archive(_) => AssetKind::Archive,
        }
    }
}

impl From<Animation> for Asset {
    fn from(anim: Animation) -> Self {
        Asset::Animation(anim)
    }
}

impl From<Archive> for Asset {
    fn from(archive: Archive) -> Self {
        Asset::Archive(archive)
    }
}

/// Options for encoding assets.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Wrap the output in Yaz0.
    pub compress: bool,
    /// Compression settings when `compress` is set.
    pub yaz0: Yaz0Options,
}

impl EncodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn with_yaz0(mut self, options: Yaz0Options) -> Self {
        self.compress = true;
        self.yaz0 = options;
        self
    }
}

/// Decode any supported file, unwrapping Yaz0 first.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedMagic`] when the (decompressed) data is
/// neither an animation nor an archive. No partial result is returned.
pub fn decode(data: &[u8]) -> Result<Asset> {
    if compression::is_compressed(data) {
        let raw = compression::decompress(data)?;
        debug!(compressed = data.len(), raw = raw.len(), "unwrapped Yaz0");
        return decode_raw(&raw);
    }
    decode_raw(data)
}

fn decode_raw(data: &[u8]) -> Result<Asset> {
    let kind = AssetKind::from_magic(data).ok_or_else(|| Error::unrecognized_magic(data))?;
    debug!(%kind, len = data.len(), "decoding asset");
    Ok(match kind {
        AssetKind::Archive => Asset::Archive(Archive::from_bytes(data)?),
        AssetKind::Animation(_) => Asset::Animation(Animation::from_bytes(data)?),
    })
}

/// Encode an asset without compression.
pub fn encode(asset: &Asset) -> Result<Vec<u8>> {
    encode_with(asset, &EncodeOptions::default())
}

/// Encode an asset, applying the Yaz0 post-pass when requested.
pub fn encode_with(asset: &Asset, options: &EncodeOptions) -> Result<Vec<u8>> {
    let raw = match asset {
        Asset::Animation(anim) => anim.to_bytes()?,
        Asset::Archive(archive) => archive.to_bytes()?,
    };
    if options.compress {
        return yaz0::compress_with(&raw, &options.yaz0);
    }
    Ok(raw)
}

/// Read and decode a file.
pub fn read_asset<P: AsRef<Path>>(path: P) -> Result<Asset> {
    let data = std::fs::read(path.as_ref())?;
    decode(&data)
}

/// Encode and write a file, replacing any existing one.
pub fn write_asset<P: AsRef<Path>>(path: P, asset: &Asset, options: &EncodeOptions) -> Result<()> {
    let data = encode_with(asset, options)?;
    std::fs::write(path.as_ref(), data)?;
    debug!(path = %path.as_ref().display(), kind = %asset.kind(), "wrote asset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{LoopMode, VisibilityAnimation};
    use crate::archive::ArchiveFile;
    use pretty_assertions::assert_eq;

    fn visibility() -> Asset {
        let mut anim = VisibilityAnimation::new(LoopMode::Loop, 3);
        anim.meshes = vec![vec![true, false, true]];
        Asset::Animation(Animation::Visibility(anim))
    }

    fn archive() -> Asset {
        let mut archive = Archive::new("res");
        archive.root.insert_file(ArchiveFile::new("a.bin", vec![7; 64]));
        Asset::Archive(archive)
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(AssetKind::from_extension("SZS"), Some(AssetKind::Archive));
        assert_eq!(
            AssetKind::from_extension("btp"),
            Some(AssetKind::Animation(AnimationKind::Btp))
        );
        assert_eq!(AssetKind::from_extension("bmd"), None);
    }

    #[test]
    fn test_dispatch_by_magic() {
        for asset in [visibility(), archive()] {
            let bytes = encode(&asset).unwrap();
            assert_eq!(AssetKind::from_magic(&bytes), Some(asset.kind()));
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.kind(), asset.kind());
            assert_eq!(encode(&decoded).unwrap(), bytes);
        }
    }

    #[test]
    fn test_compressed_archive() {
        let options = EncodeOptions::new().with_compression(true);
        let bytes = encode_with(&archive(), &options).unwrap();
        assert_eq!(&bytes[..4], b"Yaz0");
        let Asset::Archive(decoded) = decode(&bytes).unwrap() else {
            panic!("expected an archive");
        };
        assert_eq!(decoded.root.file("a.bin").unwrap().data, vec![7; 64]);
    }

    #[test]
    fn test_unknown_magic() {
        let err = decode(b"J3D1bmd3\0\0\0\0").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedMagic(magic) if &magic == b"J3D1bmd3"));
    }

    #[test]
    fn test_file_wrappers() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("vis.bva");
        write_asset(&path, &visibility(), &EncodeOptions::default()).unwrap();
        assert_eq!(read_asset(&path).unwrap(), visibility());
    }
}
