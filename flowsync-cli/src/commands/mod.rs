//! Subcommands. `pull` and `push` share their flags and the run/report loop.

pub mod init;
pub mod pull;
pub mod push;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use flowsync_core::{config, StructuredFormat, WorkspaceId};
use flowsync_sync::{render_unified, SyncContext, SyncOptions, SyncReport};

use crate::prompt::TerminalPrompter;
use crate::remote::HttpService;

/// Where the remote workspace lives.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Base URL of the remote instance.
    #[arg(long, env = "FLOWSYNC_BASE_URL")]
    pub base_url: String,

    /// Workspace id.
    #[arg(long, env = "FLOWSYNC_WORKSPACE")]
    pub workspace: String,

    /// API token.
    #[arg(long, env = "FLOWSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Flags shared by `pull` and `push`. Booleans are OR'ed with `wmill.yaml`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Sync root (defaults to the current directory).
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Compare against the directory itself and keep no `.wmill` state.
    #[arg(long)]
    pub raw: bool,

    /// Apply without asking; conflicting files are overwritten.
    #[arg(long)]
    pub yes: bool,

    /// Record conflicts instead of resolving them, and exit 1 if any.
    #[arg(long)]
    pub fail_conflicts: bool,

    /// Use JSON files instead of YAML.
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub skip_variables: bool,

    #[arg(long)]
    pub skip_resources: bool,

    #[arg(long)]
    pub skip_secrets: bool,

    #[arg(long)]
    pub include_schedules: bool,

    /// Print a unified diff for every edited file before confirming.
    #[arg(long)]
    pub show_diffs: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub report_json: bool,
}

impl RunArgs {
    /// Per-run options: `wmill.yaml` first, then the flags on top.
    pub fn options(&self) -> Result<SyncOptions> {
        let config = config::load_at(&self.root)
            .with_context(|| format!("failed to load config in {}", self.root.display()))?;
        let mut opts = SyncOptions::from_config(&config);
        opts.raw = self.raw;
        opts.yes = self.yes;
        opts.fail_conflicts = self.fail_conflicts;
        opts.show_diffs = self.show_diffs;
        opts.format = StructuredFormat::from_json_flag(self.json);
        opts.skips.skip_variables |= self.skip_variables;
        opts.skips.skip_resources |= self.skip_resources;
        opts.skips.skip_secrets |= self.skip_secrets;
        opts.skips.include_schedules |= self.include_schedules;
        Ok(opts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Pull,
    Push,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Direction::Pull => "pull",
            Direction::Push => "push",
        }
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Run one direction end to end and turn the report into an exit code.
pub(crate) fn execute(direction: Direction, remote: &RemoteArgs, run: &RunArgs) -> Result<ExitCode> {
    let opts = run.options()?;
    let service = HttpService::new(&remote.base_url, remote.token.clone());
    let prompter = TerminalPrompter;
    let workspace = WorkspaceId::from(remote.workspace.as_str());
    let ctx = SyncContext {
        root: &run.root,
        workspace: &workspace,
        service: &service,
        prompter: &prompter,
    };

    let report = runtime()?
        .block_on(async {
            match direction {
                Direction::Pull => flowsync_sync::pull(ctx, &opts).await,
                Direction::Push => flowsync_sync::push(ctx, &opts).await,
            }
        })
        .with_context(|| format!("{} failed for workspace '{workspace}'", direction.verb()))?;

    if run.report_json {
        print_json(&report)?;
    } else {
        print_summary(direction, &report);
    }

    if opts.fail_conflicts && report.has_conflicts() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReportJson<'a> {
    changes: usize,
    applied: &'a [String],
    skipped: &'a [String],
    conflicts: Vec<&'a str>,
    failures: Vec<FailureJson<'a>>,
}

#[derive(Serialize)]
struct FailureJson<'a> {
    path: &'a str,
    message: &'a str,
}

fn print_json(report: &SyncReport) -> Result<()> {
    let payload = ReportJson {
        changes: report.changes.len(),
        applied: &report.applied,
        skipped: &report.skipped,
        conflicts: report.conflicts.iter().map(|c| c.path.as_str()).collect(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureJson {
                path: &f.path,
                message: &f.message,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_summary(direction: Direction, report: &SyncReport) {
    if report.changes.is_empty() {
        println!("✓ Everything up to date");
        return;
    }

    println!(
        "✓ {} done ({} applied, {} skipped, {} conflicts, {} failed)",
        direction.verb(),
        report.applied.len(),
        report.skipped.len(),
        report.conflicts.len(),
        report.failures.len()
    );

    if !report.conflicts.is_empty() {
        println!("{}", "Conflicts (changed on both sides):".yellow().bold());
        for conflict in &report.conflicts {
            println!("  !  {}", conflict.path);
            print!("{}", render_unified(&conflict.path, &conflict.live, &conflict.incoming));
        }
    }
    if !report.failures.is_empty() {
        println!("{}", "Failures:".red().bold());
        for failure in &report.failures {
            println!("  ✗  {}: {}", failure.path, failure.message);
        }
    }
}
