//! # Archive Descriptors
//!
//! An [`ArchiveDescriptor`] is what the metadata service tells us about one
//! artifact: where its NAR lives in the binary cache and what the unpacked
//! tree should be called. It is created per request and discarded after the
//! fetch.

use serde::{Deserialize, Serialize};

use crate::store::{NarHash, StorePath};

/// Resolved location of one artifact's archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDescriptor {
    /// Content hash of the NAR archive.
    pub nar_hash: NarHash,
    /// Store path the archive unpacks to.
    pub store_path: StorePath,
}

impl ArchiveDescriptor {
    /// Create a descriptor from its validated parts.
    pub fn new(nar_hash: NarHash, store_path: StorePath) -> Self {
        Self {
            nar_hash,
            store_path,
        }
    }

    /// Name prefix used in the download URL (the store path's hash prefix).
    pub fn name_prefix(&self) -> &str {
        self.store_path.hash_prefix()
    }

    /// Directory name the unpacked tree is given inside its slot.
    pub fn tree_name(&self) -> &str {
        self.store_path.base_name()
    }

    /// Download URL: `<cache_base>/nar/<name-prefix>/<nar-hash>`.
    ///
    /// Trailing slashes on `cache_base` are ignored.
    pub fn nar_url(&self, cache_base: &str) -> String {
        format!(
            "{}/nar/{}/{}",
            cache_base.trim_end_matches('/'),
            self.name_prefix(),
            self.nar_hash
        )
    }
}
