//! # r13y-cli: Artifact Diff Command-Line Interface
//!
//! Thin clap front end over `r13y-diff` and `r13y-client`.
//!
//! ## Subcommands
//!
//! - `diff`: fetch two artifacts and write the structural-diff report
//! - `resolve`: print the binary-cache archive an artifact resolves to
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers build the pipeline context explicitly and delegate; no
//!   pipeline logic lives here.
//! - Flags override environment configuration, which overrides defaults.

pub mod diff;
pub mod logging;
pub mod resolve;
pub mod service;
