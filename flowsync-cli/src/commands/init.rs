//! `flowsync init`: write a default `wmill.yaml`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use flowsync_core::config;

/// Arguments for `flowsync init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Sync root (defaults to the current directory).
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let created = config::init_at(&self.root)
            .with_context(|| format!("failed to initialize {}", self.root.display()))?;
        let path = config::config_path_at(&self.root);
        if created {
            println!("✓ Created {}", path.display());
        } else {
            println!("· {} already exists, left untouched", path.display());
        }
        Ok(())
    }
}
