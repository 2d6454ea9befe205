//! # Validation Errors
//!
//! Errors raised while constructing domain-primitive newtypes. Each variant
//! carries the rejected input and the expected format so that operators can
//! diagnose a bad request or a malformed metadata document without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Artifact reference is not valid hexadecimal.
    #[error("invalid artifact reference \"{value}\": {reason}")]
    InvalidHex {
        /// The string that failed to decode.
        value: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Artifact reference decoded to the wrong number of bytes.
    #[error("invalid artifact reference length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required digest length in bytes.
        expected: usize,
        /// Length of the decoded input.
        actual: usize,
    },

    /// Store path is not an absolute path ending in a `<hash>-<name>` component.
    #[error("invalid store path: \"{0}\" (expected /<store>/<hash>-<name>)")]
    InvalidStorePath(String),

    /// NAR hash is empty or contains characters outside the hash alphabet.
    #[error("invalid NAR hash: \"{0}\" (expected [<algo>:]<alphanumeric digest>)")]
    InvalidNarHash(String),

    /// Slot name is neither `A` nor `B`.
    #[error("invalid slot: \"{0}\" (expected A or B)")]
    InvalidSlot(String),
}
