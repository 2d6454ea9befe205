//! # Resolve Subcommand
//!
//! `r13y resolve <REF>` prints the NAR URL an artifact would be fetched
//! from, or the full descriptor with `--json`.

use anyhow::Context;
use clap::Args;
use r13y_core::{ArchiveDescriptor, ArtifactRef};
use r13y_diff::config::DEFAULT_BINARY_CACHE_URL;

use crate::service::ServiceArgs;

/// Arguments for the resolve subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Artifact to resolve (hex digest).
    pub artifact: ArtifactRef,
    /// Binary cache base URL used to build the archive URL.
    #[arg(long, value_name = "URL", env = "R13Y_BINARY_CACHE_URL", default_value = DEFAULT_BINARY_CACHE_URL)]
    pub cache_url: String,
    /// Print the descriptor as JSON.
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Run the resolve subcommand.
pub async fn run(args: ResolveArgs) -> anyhow::Result<()> {
    let client = args.service.client()?;
    let descriptor = client
        .resolve(&args.artifact)
        .await
        .with_context(|| format!("failed to resolve {}", args.artifact))?;
    println!("{}", render(&descriptor, &args.cache_url, args.json)?);
    Ok(())
}

/// Text printed for a resolved descriptor.
pub fn render(descriptor: &ArchiveDescriptor, cache_url: &str, json: bool) -> anyhow::Result<String> {
    let url = descriptor.nar_url(cache_url);
    if !json {
        return Ok(url);
    }
    let value = serde_json::json!({
        "storePath": descriptor.store_path,
        "narHash": descriptor.nar_hash,
        "narUrl": url,
    });
    serde_json::to_string_pretty(&value).context("failed to encode descriptor")
}
