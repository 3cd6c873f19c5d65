//! # J3DKit
//!
//! A pure-Rust library for GameCube J3D animation files, RARC archives and
//! Yaz0 compression.
//!
//! ## Supported Formats
//!
//! - **Keyed animations** - `bck` joints, `blk` clusters, `brk` TEV colors,
//!   `bpk` material colors, `btk` texture matrices
//! - **Sampled animations** - `bca` joints, `bla` clusters
//! - **Sequence animations** - `btp` texture patterns, `bva` visibility
//! - **RARC archives** - directory trees, optionally Yaz0-wrapped (`.szs`)
//! - **Yaz0** - standalone compression and decompression
//!
//! Every codec decodes into an editable model and re-encodes unedited data
//! byte for byte.
//!
//! ## Quick Start
//!
//! ### Decoding any file
//!
//! ```no_run
//! use j3dkit::asset::{self, Asset};
//!
//! match asset::read_asset("mario.szs")? {
//!     Asset::Animation(anim) => println!("{} over {} frames", anim.kind(), anim.duration()),
//!     Asset::Archive(archive) => println!("{} files", archive.root.file_count()),
//! }
//! # Ok::<(), j3dkit::Error>(())
//! ```
//!
//! ### Editing an animation as a table
//!
//! ```no_run
//! use j3dkit::anim::Animation;
//!
//! let anim = Animation::from_bytes(&std::fs::read("wait.bck")?)?;
//! let mut table = anim.to_table();
//! table.duration *= 2;
//! let stretched = Animation::from_table(&table)?;
//! std::fs::write("wait_slow.bck", stretched.to_bytes()?)?;
//! # Ok::<(), j3dkit::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use j3dkit::prelude::*;
//!
//! // Now you have access to:
//! // - Animation, AnimationKind, Channel, Keyframe
//! // - Archive, Directory, ArchiveFile
//! // - Asset, decode, encode_with, EncodeOptions
//! // - Error, Result, and more
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `j3dkit` command-line binary

pub mod anim;
pub mod archive;
pub mod asset;
pub mod binary;
pub mod compression;
pub mod error;
pub mod formats;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    // Animation model
    pub use crate::anim::{
        Animation, AnimationFormat, AnimationKind, AnimationTable, Channel, HeaderTag,
        Interpolation, Keyframe, LoopMode, TangentType, Transform,
    };
    pub use crate::anim::{
        ClusterAnimation, ColorAnimation, JointAnimation, SampledClusterAnimation,
        SampledJointAnimation, TevColorAnimation, TextureMatrixAnimation,
        TexturePatternAnimation, VisibilityAnimation,
    };
    pub use crate::anim::resample::resample;

    // Archives
    pub use crate::archive::{
        Archive, ArchiveFile, ArchiveReadOptions, BatchArchiveResult, Directory,
        batch_extract, find_archive_files,
    };

    // Dispatch and compression
    pub use crate::asset::{
        Asset, AssetKind, EncodeOptions, decode, encode, encode_with, read_asset, write_asset,
    };
    pub use crate::compression::Yaz0Options;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
