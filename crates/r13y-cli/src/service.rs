//! Metadata service options shared by every subcommand.

use anyhow::Context;
use clap::Args;
use r13y_client::{ClientConfig, MetadataClient};

/// Where to find the metadata service.
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Metadata service base URL (overrides `R13Y_METADATA_URL`).
    #[arg(long, value_name = "URL")]
    pub metadata_url: Option<String>,
}

impl ServiceArgs {
    /// Environment configuration with flag overrides applied.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::from_env().context("invalid metadata service configuration")?;
        if let Some(raw) = &self.metadata_url {
            config.metadata_url = raw
                .parse()
                .with_context(|| format!("invalid --metadata-url \"{raw}\""))?;
        }
        Ok(config)
    }

    /// Metadata client for the configured service.
    pub fn client(&self) -> anyhow::Result<MetadataClient> {
        let config = self.client_config()?;
        tracing::debug!(?config, "metadata client configured");
        MetadataClient::new(config).context("failed to build metadata client")
    }
}
