//! # r13y-diff
//!
//! The artifact-diff pipeline. Given two artifact references it resolves
//! each to a NAR archive, downloads and unpacks both concurrently into an
//! isolated workspace, pins every timestamp so the trees compare
//! deterministically, runs the structural-diff tool and returns its report.
//! The workspace is removed on every exit path.
//!
//! ## Modules
//!
//! - [`workspace`]: scoped temporary directory with slots `A` and `B`.
//! - [`fetch`]: HTTP download piped into the unpack tool.
//! - [`normalize`]: timestamp pinning.
//! - [`coordinator`]: the two concurrent fetch chains.
//! - [`invoker`]: the structural-diff subprocess and outcome classification.
//! - [`pipeline`]: ties the above together per request.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod invoker;
pub mod normalize;
pub mod pipeline;
pub mod workspace;

pub use config::{CommandSpec, ConfigError, DiffConfig, UnpackWait};
pub use coordinator::{DescriptorResolver, DualFetchCoordinator, UnpackedTree};
pub use error::{DiffError, ErrorKind};
pub use fetch::ArchiveFetcher;
pub use invoker::{ClassificationStrategy, DiffInvoker, DiffReport};
pub use pipeline::DiffPipeline;
pub use workspace::{Workspace, WorkspaceGuard, WorkspaceManager};

pub use tokio_util::sync::CancellationToken;
