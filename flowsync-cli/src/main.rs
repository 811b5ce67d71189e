//! flowsync: two-way sync between a workflow workspace and a local directory.
//!
//! # Usage
//!
//! ```text
//! flowsync init [--root <dir>]
//! flowsync pull --base-url <url> --workspace <id> [--token <t>] [--raw] [--yes] [--fail-conflicts] ...
//! flowsync push --base-url <url> --workspace <id> [--token <t>] [--raw] [--yes] [--fail-conflicts] ...
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod commands;
mod prompt;
mod remote;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, pull::PullArgs, push::PushArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "flowsync",
    version,
    about = "Sync workspace scripts, flows and resources with a local directory",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default wmill.yaml into the sync root.
    Init(InitArgs),

    /// Bring remote changes into the local directory.
    Pull(PullArgs),

    /// Send local changes to the remote workspace.
    Push(PushArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Pull(args) => args.run(),
        Commands::Push(args) => args.run(),
    }
}
