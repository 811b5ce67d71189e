//! `flowsync push`: reconcile the local directory into the remote workspace.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::{execute, Direction, RemoteArgs, RunArgs};

/// Arguments for `flowsync push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl PushArgs {
    pub fn run(self) -> Result<ExitCode> {
        execute(Direction::Push, &self.remote, &self.run)
    }
}
