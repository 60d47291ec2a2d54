//! `vitrine ls` - list stored assets in a subdirectory

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use vitrine_assets::{media_type_for, AssetRoot, LogicalAssetPath};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Subdirectory to list (default: the configured final subdirectory)
    pub subdir: Option<String>,
}

pub fn run(args: LsArgs, config: &Config) -> Result<()> {
    let root = AssetRoot::new(&config.assets.root_dir)?;
    let subdir = args.subdir.as_deref().unwrap_or(&config.assets.final_subdir);
    let dir = root.subdir(subdir)?;

    if !dir.as_path().is_dir() {
        eprintln!("No such subdirectory: {subdir}");
        return Ok(());
    }

    let mut rows = Vec::new();
    for entry in std::fs::read_dir(dir.as_path())? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let meta = entry.metadata()?;
        let modified: DateTime<Utc> = meta.modified()?.into();
        rows.push((name, meta.len(), modified));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    if rows.is_empty() {
        eprintln!("No files under {subdir}/.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("File").fg(Color::Cyan),
            Cell::new("Type").fg(Color::Cyan),
            Cell::new("Bytes").fg(Color::Cyan),
            Cell::new("Modified").fg(Color::Cyan),
            Cell::new("URL").fg(Color::Cyan),
        ]);

    for (name, size, modified) in &rows {
        let url = LogicalAssetPath::parse(&format!("/{subdir}/{name}"))
            .map(|p| p.public_url())
            .unwrap_or_else(|_| "-".to_string());
        table.add_row(vec![
            Cell::new(name),
            Cell::new(media_type_for(name).unwrap_or("unknown")),
            Cell::new(size),
            Cell::new(modified.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(url),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!("{} file(s) under {subdir}/", rows.len());
    Ok(())
}
