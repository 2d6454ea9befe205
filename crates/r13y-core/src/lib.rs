#![deny(missing_docs)]

//! # r13y-core: Foundational Types for the Artifact Diff Pipeline
//!
//! This crate defines the value types shared by every other crate in the
//! workspace. It has no internal crate dependencies: only `serde`,
//! `thiserror` and `hex` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** An [`ArtifactRef`] is a
//!    fixed-length digest, a [`NarHash`] is the content hash of an archive
//!    and a [`StorePath`] is an absolute store location. None of them can be
//!    passed where another is expected.
//!
//! 2. **Validation at construction.** Hex decoding, digest length and store
//!    path shape are checked once, when the value is built. Code holding a
//!    value never re-validates it.
//!
//! 3. **[`ArchiveDescriptor`] is the sole path to a download URL.** The
//!    `<cache>/nar/<name-prefix>/<nar-hash>` layout is built in one place.

pub mod artifact;
pub mod descriptor;
pub mod error;
pub mod slot;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use artifact::{ArtifactRef, ARTIFACT_REF_LEN};
pub use descriptor::ArchiveDescriptor;
pub use error::ValidationError;
pub use slot::Slot;
pub use store::{NarHash, StorePath};
