//! # Artifact References
//!
//! An [`ArtifactRef`] identifies one build output by its fixed-length binary
//! digest. Callers hand it over hex-encoded (typically as a URL path segment);
//! the hex form is decoded and length-checked once, at construction.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Length in bytes of an artifact reference digest (SHA-256).
pub const ARTIFACT_REF_LEN: usize = 32;

/// Opaque content identifier of a single build output.
///
/// Serializes as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactRef([u8; ARTIFACT_REF_LEN]);

impl ArtifactRef {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; ARTIFACT_REF_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a hex-encoded reference (upper or lower case).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHex`] if the input is not hex, or
    /// [`ValidationError::InvalidLength`] if it does not decode to exactly
    /// [`ARTIFACT_REF_LEN`] bytes.
    pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let decoded = hex::decode(trimmed).map_err(|e| ValidationError::InvalidHex {
            value: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        let actual = decoded.len();
        let bytes: [u8; ARTIFACT_REF_LEN] =
            decoded
                .try_into()
                .map_err(|_| ValidationError::InvalidLength {
                    expected: ARTIFACT_REF_LEN,
                    actual,
                })?;
        Ok(Self(bytes))
    }

    /// Access the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; ARTIFACT_REF_LEN] {
        &self.0
    }

    /// Return the reference as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form used in log fields (first 8 hex characters).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArtifactRef({})", self.to_hex())
    }
}

impl std::str::FromStr for ArtifactRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ArtifactRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ArtifactRef> for String {
    fn from(value: ArtifactRef) -> Self {
        value.to_hex()
    }
}
