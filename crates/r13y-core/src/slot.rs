//! # Workspace Slots
//!
//! A diff workspace has exactly two slots, `A` and `B`, one per side of the
//! comparison. The slot name doubles as the subdirectory name on disk.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One side of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    /// Left-hand side.
    A,
    /// Right-hand side.
    B,
}

impl Slot {
    /// Both slots, in comparison order.
    pub const ALL: [Slot; 2] = [Slot::A, Slot::B];

    /// Directory name of the slot inside a workspace.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Slot {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(ValidationError::InvalidSlot(other.to_string())),
        }
    }
}
