//! Command execution implementations

use super::Commands;
use super::definitions::{AnimCommands, ArchiveCommands, Yaz0Commands};
use super::{anim, archive, info, yaz0};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Info { source } => info::execute(source),
            Commands::Archive { command } => command.execute(),
            Commands::Anim { command } => command.execute(),
            Commands::Yaz0 { command } => command.execute(),
        }
    }
}

impl ArchiveCommands {
    /// Execute the selected archive command.
    ///
    /// # Errors
    /// Returns an error if the underlying archive operation fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            ArchiveCommands::Extract {
                source,
                destination,
                quiet,
            } => archive::extract(source, destination.as_deref(), *quiet),
            ArchiveCommands::Pack {
                source,
                destination,
                yaz0,
            } => archive::pack(source, destination.as_deref(), *yaz0),
            ArchiveCommands::List { source } => archive::list(source),
            ArchiveCommands::BatchExtract {
                source,
                destination,
                quiet,
            } => archive::batch_extract_cmd(source, destination, *quiet),
        }
    }
}

impl AnimCommands {
    /// Execute the selected animation command.
    ///
    /// # Errors
    /// Returns an error if decoding, conversion or writing fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            AnimCommands::Export {
                source,
                destination,
            } => anim::export(source, destination),
            AnimCommands::Import {
                source,
                destination,
                yaz0,
            } => anim::import(source, destination, *yaz0),
            AnimCommands::Resample {
                source,
                destination,
            } => anim::resample(source, destination),
        }
    }
}

impl Yaz0Commands {
    /// Execute the selected Yaz0 command.
    ///
    /// # Errors
    /// Returns an error if the input cannot be read or (de)compressed.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Yaz0Commands::Compress {
                source,
                destination,
                search_depth,
                align,
            } => yaz0::compress(source, destination, *search_depth, *align),
            Yaz0Commands::Decompress {
                source,
                destination,
            } => yaz0::decompress(source, destination),
        }
    }
}
