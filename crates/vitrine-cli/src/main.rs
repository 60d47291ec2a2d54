//! vitrine - maintenance CLI for the catalog asset store
//!
//! Inspects the asset root, sweeps stale temp files left behind by
//! crashed operations, and resolves stored paths to their public URLs.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(about = "Maintenance CLI for the catalog asset store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./vitrine.toml or ~/.config/vitrine/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List stored assets in a subdirectory
    Ls(cmd::ls::LsArgs),
    /// Remove stale temp files from the asset store
    Sweep(cmd::sweep::SweepArgs),
    /// Resolve a stored path to its public URL
    Url(cmd::url::UrlArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.debug { "debug" } else { "info" }),
    )
    .init();

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Ls(args) => cmd::ls::run(args, &config),
        Command::Sweep(args) => cmd::sweep::run(args, &config),
        Command::Url(args) => cmd::url::run(args),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Asset root",
                &config.assets.root_dir.display().to_string(),
            ]);
            table.add_row(vec!["Final subdirectory", &config.assets.final_subdir]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
