//! `flowsync pull`: reconcile the remote workspace into the local directory.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::{execute, Direction, RemoteArgs, RunArgs};

/// Arguments for `flowsync pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl PullArgs {
    pub fn run(self) -> Result<ExitCode> {
        execute(Direction::Pull, &self.remote, &self.run)
    }
}
