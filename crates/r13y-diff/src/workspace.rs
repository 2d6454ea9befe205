//! # Workspace Manager
//!
//! One diff request owns one [`Workspace`]: a uniquely named temporary
//! directory holding exactly two slot directories, `A` and `B`.
//!
//! ## Lifetime
//!
//! [`WorkspaceManager::with_workspace`] is a scoped acquisition. The
//! directory is removed recursively when the operation returns `Ok` or
//! `Err`, and also when the operation's future is dropped (cancellation,
//! timeout) or panics, because the backing [`tempfile::TempDir`] is held by
//! a guard that releases it on drop.
//!
//! A failed teardown never replaces the operation's outcome; it is logged.

use std::future::Future;
use std::path::{Path, PathBuf};

use r13y_core::Slot;
use tempfile::TempDir;

use crate::config::{DiffConfig, DEFAULT_WORKSPACE_PREFIX};
use crate::error::DiffError;

/// Paths of one allocated workspace.
///
/// Cheap to clone; cloning does not extend the directory's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Workspace root; the diff tool runs with this as its working directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory of a slot: `<root>/<slot>`.
    pub fn slot_dir(&self, slot: Slot) -> PathBuf {
        self.root.join(slot.as_str())
    }

    /// Where the unpacked tree `name` of `slot` lives: `<root>/<slot>/<name>`.
    pub fn tree_dir(&self, slot: Slot, name: &str) -> PathBuf {
        self.slot_dir(slot).join(name)
    }
}

/// Allocates and tears down workspaces.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: Option<PathBuf>,
    prefix: String,
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self {
            root: None,
            prefix: DEFAULT_WORKSPACE_PREFIX.to_string(),
        }
    }
}

impl WorkspaceManager {
    /// Manager creating workspaces under `root` (system temp dir if `None`).
    pub fn new(root: Option<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root,
            prefix: prefix.into(),
        }
    }

    /// Manager configured from a [`DiffConfig`].
    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(config.workspace_root.clone(), config.workspace_prefix.clone())
    }

    /// Allocate a workspace with both slot directories created.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::Resource`] if the directory or a slot cannot be
    /// created (disk full, permission denied, missing root).
    pub fn acquire(&self) -> Result<WorkspaceGuard, DiffError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| DiffError::resource("failed to create workspace directory", e))?;

        for slot in Slot::ALL {
            let slot_dir = dir.path().join(slot.as_str());
            std::fs::create_dir(&slot_dir).map_err(|e| {
                DiffError::resource(
                    format!("failed to create slot directory {}", slot_dir.display()),
                    e,
                )
            })?;
        }

        tracing::debug!(workspace = %dir.path().display(), "workspace allocated");
        Ok(WorkspaceGuard { dir: Some(dir) })
    }

    /// Run `op` inside a fresh workspace and remove the workspace afterwards.
    ///
    /// The workspace is removed on every exit path of `op`. The result of
    /// `op` is returned unchanged even if removal fails.
    pub async fn with_workspace<F, Fut, T>(&self, op: F) -> Result<T, DiffError>
    where
        F: FnOnce(Workspace) -> Fut,
        Fut: Future<Output = Result<T, DiffError>>,
    {
        let guard = self.acquire()?;
        let result = op(guard.workspace()).await;
        guard.release().await;
        result
    }
}

/// Owner of an allocated workspace directory.
///
/// Dropping the guard removes the directory synchronously;
/// [`WorkspaceGuard::release`] removes it on the blocking pool instead.
#[derive(Debug)]
pub struct WorkspaceGuard {
    dir: Option<TempDir>,
}

impl WorkspaceGuard {
    /// Paths of the guarded workspace.
    pub fn workspace(&self) -> Workspace {
        Workspace {
            root: self
                .dir
                .as_ref()
                .map(|d| d.path().to_path_buf())
                .unwrap_or_default(),
        }
    }

    /// Remove the workspace, logging (not returning) any failure.
    pub async fn release(mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => {
                tracing::debug!(workspace = %path.display(), "workspace removed");
            }
            Ok(Err(e)) => {
                tracing::warn!(workspace = %path.display(), error = %e, "workspace teardown failed");
            }
            Err(e) => {
                tracing::warn!(workspace = %path.display(), error = %e, "workspace teardown task failed");
            }
        }
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(workspace = %path.display(), error = %e, "workspace teardown failed");
            } else {
                tracing::debug!(workspace = %path.display(), "workspace removed on unwind");
            }
        }
    }
}
