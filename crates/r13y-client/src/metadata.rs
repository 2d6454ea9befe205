//! Typed client for the reproducibility metadata service.
//!
//! The service stores one narinfo document per build output, keyed by the
//! output's digest. The document is the JSON rendering of a Nix narinfo:
//! `storePath`, `narHash`, and optionally `narSize` and `references`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use r13y_core::{ArchiveDescriptor, ArtifactRef, NarHash, StorePath};

use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::health::ServiceHealth;

// -- Types matching the metadata service schema -------------------------------

/// Narinfo document as served for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarInfo {
    pub store_path: String,
    pub nar_hash: String,
    #[serde(default)]
    pub nar_size: Option<u64>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl NarInfo {
    /// Validate the document and derive the archive descriptor from it.
    pub fn to_descriptor(&self) -> Result<ArchiveDescriptor, r13y_core::ValidationError> {
        Ok(ArchiveDescriptor::new(
            NarHash::parse(&self.nar_hash)?,
            StorePath::parse(&self.store_path)?,
        ))
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the metadata service.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl MetadataClient {
    /// Create a new metadata client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| ClientError::Config(ConfigError::InvalidToken))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.metadata_url,
        })
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Fetch the narinfo document for an artifact.
    ///
    /// Calls `GET {base_url}/narinfo/{artifact-hex}`.
    pub async fn narinfo(&self, artifact: &ArtifactRef) -> Result<NarInfo, ClientError> {
        let endpoint = "GET /narinfo/{artifact}";
        let url = self.endpoint_url(&format!("narinfo/{}", artifact.to_hex()));

        // Single attempt: a failed lookup is terminal for the request.
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }

    /// Resolve an artifact to the descriptor of its archive.
    pub async fn resolve(&self, artifact: &ArtifactRef) -> Result<ArchiveDescriptor, ClientError> {
        let narinfo = self.narinfo(artifact).await?;
        let descriptor = narinfo
            .to_descriptor()
            .map_err(|source| ClientError::Malformed {
                endpoint: "GET /narinfo/{artifact}".into(),
                source,
            })?;
        tracing::debug!(
            artifact = %artifact.short(),
            store_path = %descriptor.store_path,
            nar_hash = %descriptor.nar_hash,
            "resolved archive descriptor"
        );
        Ok(descriptor)
    }

    /// Probe whether the metadata service answers at all.
    ///
    /// Any HTTP response (even 404) counts as reachable; a 5xx or a
    /// transport failure does not.
    pub async fn health_check(&self) -> ServiceHealth {
        let url = self.endpoint_url("");
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_server_error() => ServiceHealth::Unavailable {
                reason: format!("HTTP {}", resp.status()),
            },
            Ok(_) => ServiceHealth::Healthy,
            Err(e) => ServiceHealth::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}
