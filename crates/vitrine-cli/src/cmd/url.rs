//! `vitrine url` - resolve a stored path to its public URL

use anyhow::Result;
use clap::Args;

use vitrine_assets::{media_type_for, LogicalAssetPath};

#[derive(Args, Debug)]
pub struct UrlArgs {
    /// Stored path, e.g. /products/3fa1b2.jpg
    pub path: String,
}

pub fn run(args: UrlArgs) -> Result<()> {
    let path = LogicalAssetPath::parse(&args.path)?;
    println!("{}", path.public_url());
    if let Some(media_type) = media_type_for(path.filename()) {
        log::info!("served as {media_type}");
    }
    Ok(())
}
