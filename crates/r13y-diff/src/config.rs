//! Diff pipeline configuration.
//!
//! Every external collaborator of the pipeline (binary cache, unpack tool,
//! diff tool, scratch directory) is named here. Defaults match a stock Nix
//! binary cache with `nix-nar-unpack` and `diffoscope` on `PATH`. Override
//! via environment variables or explicit construction for testing.

use std::path::PathBuf;
use std::time::Duration;

use crate::invoker::ClassificationStrategy;

/// Default binary cache serving `nar/<prefix>/<hash>` archives.
pub const DEFAULT_BINARY_CACHE_URL: &str = "https://cache.nixos.org";

/// Default bytes per write into the unpack tool's stdin.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default temporary directory name prefix.
pub const DEFAULT_WORKSPACE_PREFIX: &str = "trustix-ui-dash-diff";

/// An external program and its leading arguments.
///
/// Operands computed at run time (destination name, slot paths) are
/// appended after `args`. Programs are spawned directly, never through a
/// shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments placed before the run-time operands.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Program with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a leading argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `nix-nar-unpack <dest-name>`, reading the NAR on stdin.
    pub fn nar_unpack() -> Self {
        Self::new("nix-nar-unpack")
    }

    /// `diffoscope --html - <a> <b>`, writing the HTML report to stdout.
    pub fn diffoscope() -> Self {
        Self::new("diffoscope").arg("--html").arg("-")
    }
}

/// How long to wait for the unpack tool after its stdin has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnpackWait {
    /// Wait until the tool exits or the request is cancelled.
    #[default]
    UntilCancelled,
    /// Fail with an unpack error if the tool has not exited in time.
    Bounded(Duration),
}

/// Configuration for the diff pipeline.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Base URL of the binary cache.
    pub binary_cache_url: String,
    /// Archive unpack tool; the destination directory name is appended.
    pub unpack: CommandSpec,
    /// Structural-diff tool; the two slot paths are appended.
    pub diff: CommandSpec,
    /// Bytes per write into the unpack tool's stdin.
    pub chunk_size: usize,
    /// Wait policy for the unpack tool once input is complete.
    pub unpack_wait: UnpackWait,
    /// How the diff tool's outcome is classified.
    pub classification: ClassificationStrategy,
    /// Overall deadline for one diff request.
    pub request_timeout: Option<Duration>,
    /// TCP connect timeout for archive downloads.
    pub connect_timeout: Duration,
    /// Directory under which workspaces are created (system temp dir if unset).
    pub workspace_root: Option<PathBuf>,
    /// Name prefix of each workspace directory.
    pub workspace_prefix: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            binary_cache_url: DEFAULT_BINARY_CACHE_URL.to_string(),
            unpack: CommandSpec::nar_unpack(),
            diff: CommandSpec::diffoscope(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            unpack_wait: UnpackWait::UntilCancelled,
            classification: ClassificationStrategy::StderrEmpty,
            request_timeout: None,
            connect_timeout: Duration::from_secs(10),
            workspace_root: None,
            workspace_prefix: DEFAULT_WORKSPACE_PREFIX.to_string(),
        }
    }
}

impl DiffConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables (all optional):
    /// - `R13Y_BINARY_CACHE_URL` (default: `https://cache.nixos.org`)
    /// - `R13Y_UNPACK_PROGRAM` (default: `nix-nar-unpack`)
    /// - `R13Y_DIFF_PROGRAM` (default: `diffoscope`; keeps `--html -`)
    /// - `R13Y_CHUNK_SIZE` (default: 512)
    /// - `R13Y_UNPACK_TIMEOUT_MS` (default: wait until cancelled)
    /// - `R13Y_REQUEST_TIMEOUT_SECS` (default: no deadline)
    /// - `R13Y_CLASSIFY` (`stderr`, `exit-code` or `both`; default `stderr`)
    /// - `R13Y_WORKSPACE_ROOT` (default: system temp dir)
    /// - `R13Y_WORKSPACE_PREFIX` (default: `trustix-ui-dash-diff`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = env_nonempty("R13Y_BINARY_CACHE_URL") {
            config.binary_cache_url = url;
        }
        if let Some(program) = env_nonempty("R13Y_UNPACK_PROGRAM") {
            config.unpack.program = program;
        }
        if let Some(program) = env_nonempty("R13Y_DIFF_PROGRAM") {
            config.diff.program = program;
        }
        if let Some(size) = env_parse::<usize>("R13Y_CHUNK_SIZE")? {
            config.chunk_size = size;
        }
        if let Some(ms) = env_parse::<u64>("R13Y_UNPACK_TIMEOUT_MS")? {
            config.unpack_wait = UnpackWait::Bounded(Duration::from_millis(ms));
        }
        if let Some(secs) = env_parse::<u64>("R13Y_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(strategy) = env_nonempty("R13Y_CLASSIFY") {
            config.classification = strategy
                .parse()
                .map_err(|_| ConfigError::Invalid("R13Y_CLASSIFY".to_string(), strategy))?;
        }
        if let Some(root) = env_nonempty("R13Y_WORKSPACE_ROOT") {
            config.workspace_root = Some(PathBuf::from(root));
        }
        if let Some(prefix) = env_nonempty("R13Y_WORKSPACE_PREFIX") {
            config.workspace_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size".to_string(),
                "0".to_string(),
            ));
        }
        if self.binary_cache_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "binary_cache_url".to_string(),
                String::new(),
            ));
        }
        if self.unpack.program.is_empty() || self.diff.program.is_empty() {
            return Err(ConfigError::Invalid(
                "program".to_string(),
                String::new(),
            ));
        }
        Ok(())
    }
}

fn env_nonempty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env_nonempty(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(var.to_string(), raw)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: \"{1}\"")]
    Invalid(String, String),
}
