//! # r13y CLI Entry Point
//!
//! Parses arguments, installs tracing and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;

/// r13y: compare two build artifacts for bit-for-bit reproducibility.
///
/// Fetches both artifacts from the binary cache, unpacks them side by side
/// and runs a structural-diff tool over the result.
#[derive(Parser, Debug)]
#[command(name = "r13y", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Diff two artifacts and write the report.
    Diff(r13y_cli::diff::DiffArgs),
    /// Resolve an artifact to its binary-cache archive.
    Resolve(r13y_cli::resolve::ResolveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    r13y_cli::logging::init(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Diff(args) => r13y_cli::diff::run(args).await,
            Commands::Resolve(args) => r13y_cli::resolve::run(args).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
