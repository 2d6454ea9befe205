//! # Diff Subcommand
//!
//! `r13y diff <A> <B>` resolves both artifacts, runs the pipeline and writes
//! the report to `--output` or stdout. Ctrl-C cancels the request, which
//! kills any running subprocess and removes the workspace.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use r13y_core::ArtifactRef;
use r13y_diff::{CancellationToken, ClassificationStrategy, DiffConfig, DiffPipeline, UnpackWait};

use crate::service::ServiceArgs;

/// Arguments for the diff subcommand.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Artifact placed in slot A (hex digest).
    pub a: ArtifactRef,
    /// Artifact placed in slot B (hex digest).
    pub b: ArtifactRef,
    /// Write the report here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Binary cache base URL.
    #[arg(long, value_name = "URL")]
    pub cache_url: Option<String>,
    /// Overall request deadline in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Fail an unpack that has not exited this long after its input closed.
    #[arg(long, value_name = "MS")]
    pub unpack_timeout_ms: Option<u64>,
    /// How the diff tool's outcome is judged: stderr, exit-code or both.
    #[arg(long, value_name = "STRATEGY")]
    pub classify: Option<ClassificationStrategy>,
    #[command(flatten)]
    pub service: ServiceArgs,
}

impl DiffArgs {
    /// Apply flag overrides on top of `config`.
    pub fn apply(&self, config: &mut DiffConfig) {
        if let Some(url) = &self.cache_url {
            config.binary_cache_url = url.clone();
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = self.unpack_timeout_ms {
            config.unpack_wait = UnpackWait::Bounded(Duration::from_millis(ms));
        }
        if let Some(strategy) = self.classify {
            config.classification = strategy;
        }
    }
}

/// Run the diff subcommand.
pub async fn run(args: DiffArgs) -> anyhow::Result<()> {
    let mut config = DiffConfig::from_env().context("invalid diff configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid diff configuration")?;

    let resolver = Arc::new(args.service.client()?);
    let pipeline = DiffPipeline::new(config, resolver)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling diff");
            on_interrupt.cancel();
        }
    });

    let report = pipeline
        .diff_with_cancel(&args.a, &args.b, cancel)
        .await
        .with_context(|| format!("diff {} {} failed", args.a.short(), args.b.short()))?;

    write_report(args.output.as_deref(), report.as_bytes())
}

/// Write report bytes to `path`, or to stdout when `None`.
pub fn write_report(path: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("failed to write report to {}", path.display())),
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(bytes).context("failed to write report to stdout")?;
            out.flush().context("failed to flush stdout")
        }
    }
}
