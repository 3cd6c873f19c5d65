//! CLI commands for animation conversion

use std::path::Path;

use anyhow::{Context, bail};

use crate::anim::{Animation, AnimationTable, resample as sampling};
use crate::asset::{Asset, EncodeOptions, read_asset, write_asset};
use crate::cli::progress::{DISK, GEAR, LOOKING_GLASS, print_step};

fn read_animation(source: &Path) -> anyhow::Result<Animation> {
    match read_asset(source).with_context(|| format!("decoding {}", source.display()))? {
        Asset::Animation(anim) => Ok(anim),
        Asset::Archive(_) => bail!("{} is an archive, not an animation", source.display()),
    }
}

/// Export an animation to a JSON table
pub fn export(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let anim = read_animation(source)?;
    let table = anim.to_table();
    let json = serde_json::to_string_pretty(&table)?;
    std::fs::write(destination, json)
        .with_context(|| format!("writing {}", destination.display()))?;

    println!(
        "Exported {} ({} entities, {} frames) to {}",
        anim.kind(),
        table.entities.len(),
        table.frames.len(),
        destination.display()
    );
    Ok(())
}

/// Build an animation file from a JSON table
pub fn import(source: &Path, destination: &Path, yaz0: bool) -> anyhow::Result<()> {
    print_step(1, 3, LOOKING_GLASS, &format!("Reading {}...", source.display()));
    let json = std::fs::read_to_string(source)
        .with_context(|| format!("reading {}", source.display()))?;
    let table: AnimationTable = serde_json::from_str(&json)?;

    print_step(2, 3, GEAR, &format!("Building {} animation...", table.kind));
    let anim = Animation::from_table(&table)?;

    print_step(3, 3, DISK, &format!("Writing {}...", destination.display()));
    let options = EncodeOptions::new().with_compression(yaz0);
    write_asset(destination, &Asset::Animation(anim), &options)?;
    Ok(())
}

/// Resample a keyed animation to its sampled counterpart
pub fn resample(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let anim = read_animation(source)?;
    let sampled = sampling::resample(&anim)?;
    write_asset(destination, &Asset::Animation(sampled), &EncodeOptions::default())?;

    println!(
        "Resampled {} to {} over {} frames",
        anim.kind(),
        sampling::sampled_kind(anim.kind()).map_or("?", |k| k.extension()),
        anim.duration()
    );
    Ok(())
}
