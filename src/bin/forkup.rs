// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use forkup::{
    config::ForkConfig,
    fork::Forkup,
    git::{GitBinary, GitRunner},
    path::{fork_config_path, repository_root},
};

use anyhow::Result;
use clap::Parser;
use std::{env, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Rebuild the fork branch from fork.yaml configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    about,
    version,
    after_help = "\
What forkup does:
  1. Sync      Fetch upstream, reset the base branch to upstream, push it
  2. Rebase    Rebase each branch onto its base (dependencies first), push it
  3. Build     Recreate 'fork' from the base branch, merge all branches, push it
  4. Tag       If 'fork' changed, create and push a tag (e.g., 0.12.8-fork.1)

Configuration is read from fork.yaml in the repository root."
)]
struct Cli {
    /// Preview changes without executing them (read-only git commands still run).
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        let root = repository_root(env::current_dir()?)?;
        let config = ForkConfig::load(fork_config_path(&root))?;
        let runner = GitRunner::new(GitBinary::new(&root), self.dry_run);
        let forkup = Forkup::new(config, runner, root)?;
        forkup.run()?;

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
