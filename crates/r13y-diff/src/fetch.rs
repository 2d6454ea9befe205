//! # Archive Fetcher
//!
//! Streams one NAR archive from the binary cache straight into the stdin of
//! the unpack tool, so the archive is never buffered whole in memory.
//!
//! ## Protocol
//!
//! 1. `GET <url>`; anything but a 2xx status is a [`DiffError::Fetch`]
//!    carrying the upstream status. Nothing is spawned in that case and the
//!    destination is never created.
//! 2. Spawn `<unpack program> <args..> <dest name>` with the destination's
//!    parent as working directory.
//! 3. Copy the body into the tool's stdin in `chunk_size` pieces, then
//!    close stdin.
//! 4. Wait for the tool per [`UnpackWait`]; a non-zero exit or an expired
//!    bound is a [`DiffError::Unpack`].
//!
//! Any failure after step 2 kills the tool and removes whatever it left at
//! the destination. Cancellation aborts the download and kills the tool.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

use crate::config::{CommandSpec, DiffConfig, UnpackWait};
use crate::error::DiffError;

/// Upper bound on captured unpack stderr.
const STDERR_CAPTURE_LIMIT: u64 = 64 * 1024;

/// How long a failed fetch waits for the tool's stderr to close.
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// Downloads archives and feeds them to the unpack tool.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    http: reqwest::Client,
    unpack: CommandSpec,
    chunk_size: usize,
    wait: UnpackWait,
}

impl ArchiveFetcher {
    /// Create a fetcher from configuration.
    ///
    /// The HTTP client has a connect timeout but no overall timeout: large
    /// archives are bounded by request cancellation instead.
    pub fn new(config: &DiffConfig) -> Result<Self, DiffError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DiffError::Fetch {
                url: config.binary_cache_url.clone(),
                status: None,
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_client(
            http,
            config.unpack.clone(),
            config.chunk_size,
            config.unpack_wait,
        ))
    }

    /// Create a fetcher around an existing HTTP client.
    pub fn with_client(
        http: reqwest::Client,
        unpack: CommandSpec,
        chunk_size: usize,
        wait: UnpackWait,
    ) -> Self {
        Self {
            http,
            unpack,
            chunk_size: chunk_size.max(1),
            wait,
        }
    }

    /// Download `url` and unpack it so that `dest` holds the extracted tree.
    ///
    /// Returns the number of archive bytes streamed.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DiffError> {
        let (parent, name) = split_destination(dest)?;

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiffError::Cancelled),
            resp = self.http.get(url).send() => resp.map_err(|e| DiffError::Fetch {
                url: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            })?,
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(DiffError::Fetch {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DiffError::resource(format!("failed to create {}", parent.display()), e)
        })?;

        let started = Instant::now();
        let mut child = self.spawn_unpack(parent, name, dest)?;
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = (&mut stderr)
                    .take(STDERR_CAPTURE_LIMIT)
                    .read_to_end(&mut buf)
                    .await;
                // Keep draining so a chatty tool never blocks on a full pipe.
                let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
                String::from_utf8_lossy(&buf).trim().to_string()
            })
        });

        let outcome = self
            .stream_and_wait(url, dest, resp, &mut child, cancel)
            .await;

        let stderr = match stderr_reader {
            Some(handle) if outcome.is_err() => {
                let _ = child.start_kill();
                // A grandchild may still hold the pipe open.
                match tokio::time::timeout(STDERR_GRACE, handle).await {
                    Ok(joined) => joined.unwrap_or_default(),
                    Err(_) => String::new(),
                }
            }
            Some(handle) => {
                handle.abort();
                String::new()
            }
            None => String::new(),
        };

        match outcome {
            Ok(bytes) => {
                if !dest.exists() {
                    return Err(DiffError::Unpack {
                        dest: dest.to_path_buf(),
                        reason: "unpack tool exited successfully but produced no tree".into(),
                    });
                }
                tracing::info!(
                    url,
                    dest = %dest.display(),
                    bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "archive unpacked"
                );
                Ok(bytes)
            }
            Err(err) => {
                let _ = child.kill().await;
                remove_partial(dest).await;
                Err(attach_stderr(err, &stderr))
            }
        }
    }

    fn spawn_unpack(&self, parent: &Path, name: &str, dest: &Path) -> Result<Child, DiffError> {
        Command::new(&self.unpack.program)
            .args(&self.unpack.args)
            .arg(name)
            .current_dir(parent)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DiffError::Unpack {
                dest: dest.to_path_buf(),
                reason: format!("failed to spawn {}: {e}", self.unpack.program),
            })
    }

    async fn stream_and_wait(
        &self,
        url: &str,
        dest: &Path,
        resp: reqwest::Response,
        child: &mut Child,
        cancel: &CancellationToken,
    ) -> Result<u64, DiffError> {
        let stdin = child.stdin.take().ok_or_else(|| DiffError::Unpack {
            dest: dest.to_path_buf(),
            reason: "unpack tool has no stdin".into(),
        })?;

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiffError::Cancelled),
            copied = self.pump(url, dest, resp, stdin) => copied?,
        };

        let status = match self.wait {
            UnpackWait::UntilCancelled => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DiffError::Cancelled),
                status = child.wait() => status,
            },
            UnpackWait::Bounded(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DiffError::Cancelled),
                waited = tokio::time::timeout(limit, child.wait()) => match waited {
                    Ok(status) => status,
                    Err(_) => return Err(unpack_timeout(dest, limit)),
                },
            },
        }
        .map_err(|e| DiffError::Unpack {
            dest: dest.to_path_buf(),
            reason: format!("failed to wait for unpack tool: {e}"),
        })?;

        if !status.success() {
            return Err(DiffError::Unpack {
                dest: dest.to_path_buf(),
                reason: match status.code() {
                    Some(code) => format!("unpack tool exited with status {code}"),
                    None => "unpack tool was terminated by a signal".to_string(),
                },
            });
        }
        Ok(bytes)
    }

    async fn pump(
        &self,
        url: &str,
        dest: &Path,
        resp: reqwest::Response,
        mut stdin: ChildStdin,
    ) -> Result<u64, DiffError> {
        let mut body = resp.bytes_stream();
        let mut total = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DiffError::Fetch {
                url: url.to_string(),
                status: None,
                reason: format!("body stream failed after {total} bytes: {e}"),
            })?;
            for piece in chunk.chunks(self.chunk_size) {
                stdin.write_all(piece).await.map_err(|e| DiffError::Unpack {
                    dest: dest.to_path_buf(),
                    reason: format!("unpack tool stopped reading its input: {e}"),
                })?;
            }
            total += chunk.len() as u64;
        }
        stdin.shutdown().await.map_err(|e| DiffError::Unpack {
            dest: dest.to_path_buf(),
            reason: format!("failed to close unpack tool input: {e}"),
        })?;
        drop(stdin);
        Ok(total)
    }
}

fn split_destination(dest: &Path) -> Result<(&Path, &str), DiffError> {
    let invalid = || {
        DiffError::resource(
            format!("invalid unpack destination {}", dest.display()),
            std::io::ErrorKind::InvalidInput.into(),
        )
    };
    let parent = dest.parent().ok_or_else(invalid)?;
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?;
    Ok((parent, name))
}

fn unpack_timeout(dest: &Path, limit: Duration) -> DiffError {
    DiffError::Unpack {
        dest: dest.to_path_buf(),
        reason: format!("unpack tool did not exit within {limit:?} after its input was closed"),
    }
}

fn attach_stderr(err: DiffError, stderr: &str) -> DiffError {
    match err {
        DiffError::Unpack { dest, reason } if !stderr.is_empty() => DiffError::Unpack {
            dest,
            reason: format!("{reason}; stderr: {stderr}"),
        },
        other => other,
    }
}

async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_dir_all(dest).await {
        Ok(()) => tracing::debug!(dest = %dest.display(), "removed partial tree"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(dest = %dest.display(), error = %e, "failed to remove partial tree")
        }
    }
}
