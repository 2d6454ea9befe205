//! # Diff Pipeline
//!
//! Entry point for one diff request:
//!
//! ```text
//! with_workspace ─► fetch_both (A ∥ B) ─► diff ─► teardown
//! ```
//!
//! A [`DiffPipeline`] is an explicitly constructed context: it owns the
//! configuration, the resolver and the HTTP client, and is shared across
//! requests. Each request gets its own workspace and cancellation scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use r13y_core::ArtifactRef;
use tokio_util::sync::CancellationToken;

use crate::config::DiffConfig;
use crate::coordinator::{DescriptorResolver, DualFetchCoordinator};
use crate::error::DiffError;
use crate::fetch::ArchiveFetcher;
use crate::invoker::{DiffInvoker, DiffReport};
use crate::workspace::WorkspaceManager;

/// Resolve, fetch, normalize and diff two artifacts.
#[derive(Debug, Clone)]
pub struct DiffPipeline {
    config: DiffConfig,
    workspaces: WorkspaceManager,
    coordinator: DualFetchCoordinator,
    invoker: DiffInvoker,
}

impl DiffPipeline {
    /// Build a pipeline from configuration and a metadata resolver.
    pub fn new(
        config: DiffConfig,
        resolver: Arc<dyn DescriptorResolver>,
    ) -> Result<Self, DiffError> {
        let fetcher = Arc::new(ArchiveFetcher::new(&config)?);
        let coordinator =
            DualFetchCoordinator::new(resolver, fetcher, config.binary_cache_url.clone());
        let invoker = DiffInvoker::new(config.diff.clone(), config.classification);
        Ok(Self {
            workspaces: WorkspaceManager::from_config(&config),
            coordinator,
            invoker,
            config,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diff `a` (slot A) against `b` (slot B).
    pub async fn diff(&self, a: &ArtifactRef, b: &ArtifactRef) -> Result<DiffReport, DiffError> {
        self.diff_with_cancel(a, b, CancellationToken::new()).await
    }

    /// Diff `a` against `b`, aborting when `cancel` fires.
    ///
    /// Cancelling kills any running unpack or diff process, stops both
    /// downloads and removes the workspace before returning
    /// [`DiffError::Cancelled`]. The configured request timeout, if any,
    /// does the same and returns [`DiffError::TimedOut`].
    pub async fn diff_with_cancel(
        &self,
        a: &ArtifactRef,
        b: &ArtifactRef,
        cancel: CancellationToken,
    ) -> Result<DiffReport, DiffError> {
        let started = Instant::now();
        let request = cancel.child_token();
        let timed_out = Arc::new(AtomicBool::new(false));

        let deadline = self.config.request_timeout.map(|after| {
            let token = request.clone();
            let flag = Arc::clone(&timed_out);
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(after) => {
                        flag.store(true, Ordering::SeqCst);
                        token.cancel();
                    }
                }
            })
        });

        tracing::info!(a = %a.short(), b = %b.short(), "diff requested");

        let result = self
            .workspaces
            .with_workspace(|ws| {
                let request = request.clone();
                async move {
                    let (tree_a, tree_b) = self
                        .coordinator
                        .fetch_both(a, b, &ws, &request)
                        .await?;
                    self.invoker.diff(&ws, &tree_a, &tree_b, &request).await
                }
            })
            .await;

        if let Some(handle) = deadline {
            handle.abort();
        }

        let result = match result {
            Err(e) if e.is_cancelled() && timed_out.load(Ordering::SeqCst) => {
                Err(DiffError::TimedOut {
                    after: self.config.request_timeout.unwrap_or_default(),
                })
            }
            other => other,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => tracing::info!(
                a = %a.short(),
                b = %b.short(),
                report_bytes = report.len(),
                elapsed_ms,
                "diff request finished"
            ),
            Err(e) => tracing::error!(
                a = %a.short(),
                b = %b.short(),
                kind = %e.kind(),
                error = %e,
                elapsed_ms,
                "diff request failed"
            ),
        }
        result
    }
}
