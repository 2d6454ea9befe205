//! # Store Paths and NAR Hashes
//!
//! The metadata service describes a build output with a store path
//! (`/nix/store/<hash>-<name>`) and the content hash of its NAR archive
//! (`sha256:<digest>`). The binary cache addresses archives by the store
//! path's hash prefix and the bare NAR digest, so both are parsed here.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Content hash of a NAR archive, without its algorithm tag.
///
/// Built from the metadata service's `narHash` field: everything after the
/// last `:` is kept, so both `sha256:1b8m...` and a bare `1b8m...` parse to
/// the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NarHash(String);

impl NarHash {
    /// Parse a (possibly algorithm-tagged) NAR hash.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNarHash`] if the digest part is
    /// empty or contains anything other than ASCII alphanumerics.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let digest = value.rsplit(':').next().unwrap_or_default();
        if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidNarHash(value.to_string()));
        }
        Ok(Self(digest.to_string()))
    }

    /// Access the bare digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NarHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NarHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NarHash> for String {
    fn from(value: NarHash) -> Self {
        value.0
    }
}

/// Absolute store path of a build output.
///
/// # Validation
///
/// - Must be absolute.
/// - The last component is the store base name (`<hash>-<name>`); it must
///   not be `.` or `..`.
/// - The hash prefix (text before the first `-` of the base name) must be a
///   non-empty run of ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath(String);

impl StorePath {
    /// Parse and validate a store path.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStorePath`] if the path does not
    /// have the shape described above.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidStorePath(value.to_string());
        if !value.starts_with('/') {
            return Err(invalid());
        }
        let trimmed = value.trim_end_matches('/');
        let base = trimmed.rsplit('/').next().unwrap_or_default();
        if base.is_empty() || base == "." || base == ".." {
            return Err(invalid());
        }
        let prefix = base.split('-').next().unwrap_or_default();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The full path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component, e.g. `abc123-hello-2.12`.
    pub fn base_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Hash prefix of the base name, e.g. `abc123`.
    pub fn hash_prefix(&self) -> &str {
        self.base_name().split('-').next().unwrap_or_default()
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorePath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorePath> for String {
    fn from(value: StorePath) -> Self {
        value.0
    }
}
