//! # r13y-client -- Typed Rust client for the reproducibility metadata service
//!
//! Resolves an [`ArtifactRef`](r13y_core::ArtifactRef) to the
//! [`ArchiveDescriptor`](r13y_core::ArchiveDescriptor) of its NAR archive by
//! fetching the narinfo document the metadata service keeps for it.
//!
//! ## Architecture
//!
//! This crate is the only place that speaks to the metadata service. The
//! diff pipeline consumes it through the `DescriptorResolver` seam in
//! `r13y-diff`, so tests can substitute a static resolver.
//!
//! ## API Path Convention
//!
//! `{base_url}/narinfo/{artifact-hex}` returns the narinfo JSON document.

pub mod config;
pub mod error;
pub mod health;
pub mod metadata;

pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use health::ServiceHealth;
pub use metadata::{MetadataClient, NarInfo};
