//! # Diff Pipeline Errors
//!
//! Every failure of a diff request is reported as exactly one [`DiffError`].
//! None of them are retried inside the pipeline; the caller may retry the
//! whole request. [`DiffError::kind`] gives the stable classification a
//! caller branches on, the variant fields carry the diagnostic context.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Stable classification of a [`DiffError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Metadata lookup failed or returned an unusable document.
    Resolution,
    /// Archive download failed (non-success status or network failure).
    Fetch,
    /// Archive extraction failed, timed out or produced nothing.
    Unpack,
    /// Local filesystem resource could not be allocated or prepared.
    Resource,
    /// The structural-diff tool failed.
    DiffTool,
    /// The request was cancelled by its caller.
    Cancelled,
    /// The request exceeded its deadline.
    TimedOut,
    /// A fetch chain panicked.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Resolution => "ResolutionError",
            Self::Fetch => "FetchError",
            Self::Unpack => "UnpackError",
            Self::Resource => "ResourceError",
            Self::DiffTool => "DiffToolError",
            Self::Cancelled => "Cancelled",
            Self::TimedOut => "TimedOut",
            Self::Internal => "InternalError",
        };
        f.write_str(s)
    }
}

/// Error type for a single diff request.
#[derive(Error, Debug)]
pub enum DiffError {
    /// The artifact could not be resolved to an archive descriptor.
    #[error("failed to resolve artifact {artifact}: {reason}")]
    Resolution {
        /// Hex form of the artifact reference.
        artifact: String,
        /// What went wrong.
        reason: String,
    },

    /// The archive could not be downloaded.
    #[error("failed to fetch {url}{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Fetch {
        /// Archive URL.
        url: String,
        /// Upstream HTTP status, if the server answered.
        status: Option<u16>,
        /// What went wrong.
        reason: String,
    },

    /// The unpack subprocess failed.
    #[error("failed to unpack into {}: {reason}", .dest.display())]
    Unpack {
        /// Destination tree.
        dest: PathBuf,
        /// What went wrong, including captured stderr when available.
        reason: String,
    },

    /// A local filesystem operation failed.
    #[error("{context}: {source}")]
    Resource {
        /// The operation and path involved.
        context: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The structural-diff tool reported a failure.
    #[error("diff tool failed{}: {stderr}", .exit_code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    DiffTool {
        /// Captured stderr, or a description of why the tool could not run.
        stderr: String,
        /// Process exit code, if it exited normally.
        exit_code: Option<i32>,
    },

    /// The request was cancelled before it completed.
    #[error("diff request cancelled")]
    Cancelled,

    /// The request exceeded its deadline.
    #[error("diff request timed out after {after:?}")]
    TimedOut {
        /// The configured deadline.
        after: Duration,
    },

    /// A fetch chain task panicked or was aborted.
    #[error("fetch chain failed: {0}")]
    Task(String),
}

impl DiffError {
    /// Build a [`DiffError::Resource`] from an I/O error and a description.
    pub fn resource(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resource {
            context: context.into(),
            source,
        }
    }

    /// Stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Unpack { .. } => ErrorKind::Unpack,
            Self::Resource { .. } => ErrorKind::Resource,
            Self::DiffTool { .. } => ErrorKind::DiffTool,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::Task(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error only reports that the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
