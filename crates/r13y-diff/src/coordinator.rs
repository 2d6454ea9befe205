//! # Dual-Fetch Coordinator
//!
//! Resolves both artifact references, then runs the fetch → unpack →
//! normalize chain for slot `A` and slot `B` as two tasks on a
//! [`JoinSet`]. Each chain writes only to its own slot directory, so the
//! chains share nothing mutable.
//!
//! ## Failure
//!
//! The first chain to fail decides the outcome. Its sibling is cancelled
//! through a child [`CancellationToken`] (killing the sibling's unpack tool
//! and dropping its HTTP stream) and awaited before the error is returned,
//! so no task outlives the call. Whatever the sibling already wrote is
//! discarded with the workspace.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use r13y_client::MetadataClient;
use r13y_core::{ArchiveDescriptor, ArtifactRef, Slot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::DiffError;
use crate::fetch::ArchiveFetcher;
use crate::normalize;
use crate::workspace::Workspace;

/// Resolves an artifact reference to the archive it is stored as.
#[async_trait]
pub trait DescriptorResolver: Send + Sync {
    /// Look up the archive descriptor of `artifact`.
    ///
    /// Failures must be reported as [`DiffError::Resolution`].
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<ArchiveDescriptor, DiffError>;
}

#[async_trait]
impl DescriptorResolver for MetadataClient {
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<ArchiveDescriptor, DiffError> {
        MetadataClient::resolve(self, artifact)
            .await
            .map_err(|e| DiffError::Resolution {
                artifact: artifact.to_hex(),
                reason: e.to_string(),
            })
    }
}

/// One slot's unpacked, normalized tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedTree {
    /// Slot the tree was unpacked into.
    pub slot: Slot,
    /// Absolute path of the tree.
    pub path: PathBuf,
    /// Path relative to the workspace root, e.g. `A/<store name>`.
    pub relative: String,
    /// Descriptor the archive was fetched from.
    pub descriptor: ArchiveDescriptor,
    /// Archive bytes downloaded.
    pub bytes: u64,
    /// Entries stamped by the normalizer.
    pub entries: usize,
}

/// Runs the two fetch chains of a diff request.
#[derive(Clone)]
pub struct DualFetchCoordinator {
    resolver: Arc<dyn DescriptorResolver>,
    fetcher: Arc<ArchiveFetcher>,
    cache_base: String,
}

impl std::fmt::Debug for DualFetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualFetchCoordinator")
            .field("fetcher", &self.fetcher)
            .field("cache_base", &self.cache_base)
            .finish_non_exhaustive()
    }
}

impl DualFetchCoordinator {
    /// Coordinator resolving through `resolver` and downloading archives
    /// from `cache_base` with `fetcher`.
    pub fn new(
        resolver: Arc<dyn DescriptorResolver>,
        fetcher: Arc<ArchiveFetcher>,
        cache_base: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            cache_base: cache_base.into(),
        }
    }

    /// Populate slot `A` from `a` and slot `B` from `b`.
    ///
    /// Returns the trees in slot order. On failure, returns the first error
    /// observed and leaves no chain running.
    pub async fn fetch_both(
        &self,
        a: &ArtifactRef,
        b: &ArtifactRef,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<(UnpackedTree, UnpackedTree), DiffError> {
        let (desc_a, desc_b) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiffError::Cancelled),
            resolved = futures::future::try_join(
                self.resolver.resolve(a),
                self.resolver.resolve(b),
            ) => resolved?,
        };

        let chains = cancel.child_token();
        // Stops both chains, normalizer walks included, if this future is dropped.
        let _stop_on_drop = chains.clone().drop_guard();
        let mut set = JoinSet::new();
        for (slot, descriptor) in [(Slot::A, desc_a), (Slot::B, desc_b)] {
            let fetcher = Arc::clone(&self.fetcher);
            let url = descriptor.nar_url(&self.cache_base);
            let dest = workspace.tree_dir(slot, descriptor.tree_name());
            let token = chains.clone();
            set.spawn(async move { run_chain(&fetcher, slot, descriptor, url, dest, &token).await });
        }

        let mut tree_a = None;
        let mut tree_b = None;
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let outcome = joined
                .map_err(|e| DiffError::Task(e.to_string()))
                .and_then(|r| r);
            match outcome {
                Ok(tree) => match tree.slot {
                    Slot::A => tree_a = Some(tree),
                    Slot::B => tree_b = Some(tree),
                },
                Err(err) => {
                    // The sibling reports Cancelled once we cancel it; keep the cause.
                    if first_error.is_none() {
                        tracing::warn!(error = %err, kind = %err.kind(), "fetch chain failed, cancelling sibling");
                        chains.cancel();
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        match (tree_a, tree_b) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(DiffError::Task("fetch chain finished without a result".into())),
        }
    }
}

async fn run_chain(
    fetcher: &ArchiveFetcher,
    slot: Slot,
    descriptor: ArchiveDescriptor,
    url: String,
    dest: PathBuf,
    cancel: &CancellationToken,
) -> Result<UnpackedTree, DiffError> {
    tracing::debug!(%slot, %url, dest = %dest.display(), "fetch chain started");
    let bytes = fetcher.fetch(&url, &dest, cancel).await?;

    // The walk observes the token and only returns once it has stopped.
    let entries = normalize::normalize(dest.clone(), cancel.clone()).await?;

    let relative = format!("{}/{}", slot.as_str(), descriptor.tree_name());
    Ok(UnpackedTree {
        slot,
        path: dest,
        relative,
        descriptor,
        bytes,
        entries,
    })
}
