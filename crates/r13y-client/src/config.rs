//! Metadata service client configuration.
//!
//! Configures the base URL of the reproducibility metadata service. Defaults
//! point to a locally running service. Override via environment variables or
//! explicit construction for staging/testing.

use url::Url;
use zeroize::Zeroizing;

/// Default metadata service location.
pub const DEFAULT_METADATA_URL: &str = "http://127.0.0.1:8080";

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the metadata service.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the metadata service.
    /// Default: <http://127.0.0.1:8080>
    pub metadata_url: Url,
    /// Optional bearer token sent with every request.
    pub api_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("metadata_url", &self.metadata_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration for the given base URL with default settings.
    pub fn new(metadata_url: Url) -> Self {
        Self {
            metadata_url,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `R13Y_METADATA_URL` (default: `http://127.0.0.1:8080`)
    /// - `R13Y_API_TOKEN` (optional)
    /// - `R13Y_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("R13Y_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new);

        Ok(Self {
            metadata_url: env_url("R13Y_METADATA_URL", DEFAULT_METADATA_URL)?,
            api_token,
            timeout_secs: env_timeout("R13Y_TIMEOUT_SECS")?,
        })
    }

    /// Create a configuration pointing to a local mock server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the localhost URL cannot be parsed
    /// (should not occur for valid port numbers, but avoids `expect()`).
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        let metadata_url = Url::parse(&format!("http://127.0.0.1:{port}"))
            .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))?;
        Ok(Self {
            metadata_url,
            api_token: None,
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_timeout(var: &str) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(var.to_string(), raw)),
        _ => Ok(DEFAULT_TIMEOUT_SECS),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: \"{1}\"")]
    Invalid(String, String),
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
}
