//! # Diff Invoker
//!
//! Runs the structural-diff tool over the two unpacked trees of a workspace
//! and turns its outcome into a [`DiffReport`] or a [`DiffError::DiffTool`].
//!
//! The tool runs with the workspace root as working directory and receives
//! the trees as relative paths (`A/<name>`, `B/<name>`), so the report never
//! mentions the temporary directory and two runs over the same inputs give
//! identical output.

use std::process::Stdio;
use std::str::FromStr;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::CommandSpec;
use crate::coordinator::UnpackedTree;
use crate::error::DiffError;
use crate::workspace::Workspace;

/// How a finished diff process is judged successful.
///
/// Diff tools conventionally exit 1 when the inputs differ, so the exit code
/// alone does not signal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationStrategy {
    /// Success iff nothing was written to stderr.
    #[default]
    StderrEmpty,
    /// Success iff the exit code is 0 (no differences) or 1 (differences).
    ExitCode,
    /// Both of the above must hold.
    Both,
}

impl ClassificationStrategy {
    /// Classify a finished run.
    ///
    /// `exit_code` is `None` when the process was killed by a signal.
    pub fn is_success(self, exit_code: Option<i32>, stderr: &[u8]) -> bool {
        let quiet = stderr.is_empty();
        let clean_exit = matches!(exit_code, Some(0) | Some(1));
        match self {
            Self::StderrEmpty => quiet,
            Self::ExitCode => clean_exit,
            Self::Both => quiet && clean_exit,
        }
    }

    /// Canonical name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StderrEmpty => "stderr",
            Self::ExitCode => "exit-code",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for ClassificationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown classification strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown classification strategy \"{0}\" (expected stderr, exit-code or both)")]
pub struct UnknownStrategy(pub String);

impl FromStr for ClassificationStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stderr" | "stderr-empty" => Ok(Self::StderrEmpty),
            "exit-code" | "exitcode" => Ok(Self::ExitCode),
            "both" => Ok(Self::Both),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// The diff tool's standard output for a successful run.
///
/// Bytes are passed through verbatim; an empty report means the tool found
/// nothing to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    bytes: Vec<u8>,
    exit_code: Option<i32>,
}

impl DiffReport {
    /// Wrap raw report bytes.
    pub fn new(bytes: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self { bytes, exit_code }
    }

    /// Report bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take ownership of the report bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Whether the tool produced no output.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Report length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Exit code the tool finished with.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

/// Spawns the diff tool and classifies its outcome.
#[derive(Debug, Clone)]
pub struct DiffInvoker {
    spec: CommandSpec,
    strategy: ClassificationStrategy,
}

impl DiffInvoker {
    /// Invoker running `spec` and judging its outcome with `strategy`.
    pub fn new(spec: CommandSpec, strategy: ClassificationStrategy) -> Self {
        Self { spec, strategy }
    }

    /// Diff tree `a` against tree `b`.
    ///
    /// Both trees must already be unpacked and normalized inside `workspace`.
    pub async fn diff(
        &self,
        workspace: &Workspace,
        a: &UnpackedTree,
        b: &UnpackedTree,
        cancel: &CancellationToken,
    ) -> Result<DiffReport, DiffError> {
        let started = std::time::Instant::now();
        let child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .arg(&a.relative)
            .arg(&b.relative)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DiffError::DiffTool {
                stderr: format!("failed to spawn {}: {e}", self.spec.program),
                exit_code: None,
            })?;

        // Dropping the wait future kills the tool via kill_on_drop.
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiffError::Cancelled),
            output = child.wait_with_output() => output.map_err(|e| DiffError::DiffTool {
                stderr: format!("failed to collect diff tool output: {e}"),
                exit_code: None,
            })?,
        };

        let exit_code = output.status.code();
        if !self.strategy.is_success(exit_code, &output.stderr) {
            tracing::warn!(
                program = %self.spec.program,
                exit_code,
                strategy = %self.strategy,
                "diff tool failed"
            );
            return Err(DiffError::DiffTool {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code,
            });
        }

        tracing::info!(
            a = %a.relative,
            b = %b.relative,
            exit_code,
            report_bytes = output.stdout.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "diff complete"
        );
        Ok(DiffReport::new(output.stdout, exit_code))
    }
}
