//! Subcommand enum definitions for CLI

use clap::Subcommand;
use std::path::PathBuf;

/// RARC archive commands
#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Extract an archive (.arc, .szs) to a directory
    Extract {
        /// Source archive
        source: PathBuf,

        /// Output directory (defaults to `<source>_ext`)
        destination: Option<PathBuf>,

        /// Suppress step output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Pack a directory into an archive
    ///
    /// The source must contain exactly one folder, which becomes the root.
    Pack {
        /// Directory holding the root folder
        source: PathBuf,

        /// Output archive (defaults to `<source>.arc`, or `.szs` with --yaz0)
        destination: Option<PathBuf>,

        /// Compress the archive with Yaz0
        #[arg(long)]
        yaz0: bool,
    },

    /// List the contents of an archive
    List {
        /// Archive file
        source: PathBuf,
    },

    /// Extract every archive below a directory in parallel
    BatchExtract {
        /// Directory to search for archives
        source: PathBuf,

        /// Output directory
        destination: PathBuf,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}

/// J3D animation commands
#[derive(Subcommand)]
pub enum AnimCommands {
    /// Export an animation to a JSON table
    Export {
        /// Animation file (.bck, .brk, ...)
        source: PathBuf,

        /// Output JSON file
        destination: PathBuf,
    },

    /// Build an animation from a JSON table
    Import {
        /// JSON table file
        source: PathBuf,

        /// Output animation file
        destination: PathBuf,

        /// Compress the output with Yaz0
        #[arg(long)]
        yaz0: bool,
    },

    /// Resample a keyed animation to one value per frame (bck to bca, blk to bla)
    Resample {
        /// Keyed animation file
        source: PathBuf,

        /// Output sampled animation file
        destination: PathBuf,
    },
}

/// Yaz0 compression commands
#[derive(Subcommand)]
pub enum Yaz0Commands {
    /// Compress a file
    Compress {
        /// Input file
        source: PathBuf,

        /// Output file
        destination: PathBuf,

        /// Match search window in bytes (at most 4096)
        #[arg(long, default_value_t = 0x1000)]
        search_depth: usize,

        /// Pad the output to 32 bytes
        #[arg(long)]
        align: bool,
    },

    /// Decompress a file
    Decompress {
        /// Input file
        source: PathBuf,

        /// Output file
        destination: PathBuf,
    },
}
