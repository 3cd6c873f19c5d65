use clap::Subcommand;
use std::path::PathBuf;

pub mod anim;
pub mod archive;
pub mod definitions;
pub mod execute;
pub mod info;
pub mod yaz0;

use definitions::{AnimCommands, ArchiveCommands, Yaz0Commands};

#[derive(Subcommand)]
pub enum Commands {
    /// Show a summary of any supported file
    Info {
        /// Animation or archive file (optionally Yaz0-compressed)
        source: PathBuf,
    },

    /// RARC archive operations
    Archive {
        #[command(subcommand)]
        command: ArchiveCommands,
    },

    /// J3D animation operations
    Anim {
        #[command(subcommand)]
        command: AnimCommands,
    },

    /// Yaz0 compression
    Yaz0 {
        #[command(subcommand)]
        command: Yaz0Commands,
    },
}

/// Format byte size for display
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
