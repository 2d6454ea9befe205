//! Reachability of the metadata service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of the metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceHealth {
    /// Service answered.
    Healthy,
    /// Service is not reachable or answered with a server error.
    Unavailable {
        /// Human-readable reason for unavailability.
        reason: String,
    },
}

impl ServiceHealth {
    /// Whether the service is usable.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Unavailable { reason } => write!(f, "Unavailable: {reason}"),
        }
    }
}
