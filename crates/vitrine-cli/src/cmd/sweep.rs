//! `vitrine sweep` - remove stale temp files from the asset store

use anyhow::Result;
use clap::Args;

use vitrine_assets::{AssetRoot, StagingStore};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Report what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: SweepArgs, config: &Config) -> Result<()> {
    let root = AssetRoot::new(&config.assets.root_dir)?;
    let store = StagingStore::new(root)?;

    if args.dry_run {
        let stale = store.stale_temp_files()?;
        if stale.is_empty() {
            eprintln!("Temp area is clean.");
        } else {
            for name in &stale {
                eprintln!("would remove {name}");
            }
            eprintln!("{} stale temp file(s)", stale.len());
        }
        return Ok(());
    }

    let removed = store.sweep_temp()?;
    eprintln!("Removed {removed} stale temp file(s).");
    Ok(())
}
