//! # Metadata Normalizer
//!
//! Pins the access and modification time of every entry of an unpacked tree
//! to [`SENTINEL_MTIME`], so two byte-identical trees have identical
//! metadata no matter when they were downloaded. Must run after the unpack
//! tool has exited and before the diff tool starts.
//!
//! Symlinks are not followed: the link itself is stamped, its target is
//! left alone (it may point outside the tree, or nowhere).
//!
//! The walk checks its [`CancellationToken`] before every entry and stops
//! with [`DiffError::Cancelled`], so a cancelled request never has a walk
//! still writing into a workspace that is being torn down.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::DiffError;

/// Sentinel timestamp, in seconds since the Unix epoch.
pub const SENTINEL_MTIME: i64 = 1;

/// The sentinel as a [`FileTime`].
pub fn sentinel() -> FileTime {
    FileTime::from_unix_time(SENTINEL_MTIME, 0)
}

/// Stamp every entry under `root`, including `root`. Returns the number of
/// entries stamped.
///
/// Blocking; use [`normalize`] from async code.
pub fn normalize_blocking(root: &Path, cancel: &CancellationToken) -> Result<usize, DiffError> {
    let stamp = sentinel();
    let mut count = 0usize;
    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        if cancel.is_cancelled() {
            tracing::debug!(root = %root.display(), stamped = count, "normalization cancelled");
            return Err(DiffError::Cancelled);
        }
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            DiffError::resource(
                format!("failed to walk {path}"),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
            )
        })?;
        filetime::set_symlink_file_times(entry.path(), stamp, stamp).map_err(|e| {
            DiffError::resource(
                format!("failed to set timestamps on {}", entry.path().display()),
                e,
            )
        })?;
        count += 1;
    }
    Ok(count)
}

/// Stamp every entry under `root` on the blocking pool.
///
/// Resolves only once the walk has stopped, also when it was cancelled.
pub async fn normalize(root: PathBuf, cancel: CancellationToken) -> Result<usize, DiffError> {
    let started = std::time::Instant::now();
    let root_display = root.display().to_string();
    let count = tokio::task::spawn_blocking(move || normalize_blocking(&root, &cancel))
        .await
        .map_err(|e| DiffError::Task(format!("normalizer task failed: {e}")))??;
    tracing::debug!(
        root = %root_display,
        entries = count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "timestamps normalized"
    );
    Ok(count)
}
