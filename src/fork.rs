// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fork branch orchestration.
//!
//! The __fork branch__ is an integration branch that combines the base branch
//! with every feature branch listed in the fork configuration. Forkup rebuilds
//! it from scratch on every run through four phases:
//!
//! 1. __Sync__: fetch upstream, hard reset the base branch onto upstream's
//!    tip, and push the base branch.
//! 2. __Rebase__: rebase each feature branch onto its base in dependency
//!    order, and push it.
//! 3. __Build__: recreate the fork branch from the base branch, merge every
//!    feature branch into it in declaration order, and push it.
//! 4. __Tag__: if the fork branch moved since the run started, tag it as
//!    `<version>-fork.<n>` and push the tag.
//!
//! All pushes use `--force-with-lease`, so a branch that someone else updated
//! on the remote in the meantime makes the push fail instead of being
//! overwritten.
//!
//! # Failure
//!
//! Any failing Git command halts the run. Nothing performed by earlier phases
//! is rolled back. Running forkup again from scratch is safe, because every
//! phase converges on the same result for unchanged inputs, and the tag phase
//! only tags when the fork branch actually changed.
//!
//! A merge conflict while building the fork branch is left in place for the
//! user to resolve, along with instructions on how to continue or back out.

use crate::{
    config::{ConfigError, ForkConfig},
    git::{CommitId, Git, GitBinary, GitCommand, GitError, GitRunner},
    metadata::{MetadataError, ProjectMetadata},
    tag::{ForkTag, TagError},
};

use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

/// Name of generated integration branch.
pub const FORK_BRANCH: &str = "fork";

/// Remote that receives pushed branches and tags.
pub const ORIGIN: &str = "origin";

/// Fork branch maintainer.
#[derive(Debug)]
pub struct Forkup<G = GitBinary>
where
    G: Git,
{
    config: ForkConfig,
    runner: GitRunner<G>,
    root: PathBuf,
    original_head: String,
}

impl<G> Forkup<G>
where
    G: Git,
{
    /// Construct new fork maintainer for repository at root.
    ///
    /// Remembers the currently checked out branch so that the user can be
    /// pointed back to it if the run stops on a merge conflict. With a
    /// detached HEAD the current commit is remembered instead.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::Git`] if current branch cannot be determined.
    pub fn new(config: ForkConfig, runner: GitRunner<G>, root: impl Into<PathBuf>) -> Result<Self> {
        let original_head = match runner.current_branch()? {
            branch if !branch.is_empty() => branch,
            _ => runner
                .resolve("HEAD")?
                .map(|id| id.to_string())
                .unwrap_or_else(|| "HEAD".into()),
        };

        Ok(Self {
            config,
            runner,
            root: root.into(),
            original_head,
        })
    }

    /// Command runner in use.
    pub fn runner(&self) -> &GitRunner<G> {
        &self.runner
    }

    /// Run all four phases, then summarize the result.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::DirtyWorkTree`] if there are uncommitted changes.
    /// - Return [`ForkError::MergeConflict`] if a merge conflicts.
    /// - Return [`ForkError::Git`] if any required Git command fails.
    /// - Return [`ForkError::Metadata`] if project version cannot be read.
    /// - Return [`ForkError::Tag`] if no fork number is left for the version.
    pub fn run(&self) -> Result<RunReport> {
        if self.runner.is_dry_run() {
            info!("=== DRY RUN MODE - no changes will be made ===");
        }

        self.check_clean()?;
        let old_fork = self.runner.resolve(&fork_ref())?;

        self.sync_upstream()?;
        self.rebase_branches()?;
        self.build_fork()?;
        let tag = self.tag_fork(old_fork.as_ref())?;

        let report = RunReport {
            tag,
            dry_run: self.runner.is_dry_run(),
        };
        self.summarize(&report);

        Ok(report)
    }

    /// Ensure working tree has no uncommitted changes.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::DirtyWorkTree`] if there are uncommitted changes.
    pub fn check_clean(&self) -> Result<()> {
        if self.runner.has_uncommitted_changes()? {
            return Err(ForkError::DirtyWorkTree);
        }

        Ok(())
    }

    /// Fetch upstream and reset base branch to match it.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::Git`] if any Git command fails.
    #[instrument(skip(self), level = "debug")]
    pub fn sync_upstream(&self) -> Result<()> {
        let upstream = &self.config.upstream;
        let base = self.config.base.as_str();
        info!("=== syncing with upstream ({upstream}) ===");

        self.runner
            .require(&GitCommand::new(["fetch", upstream.remote.as_str()]))?;
        self.runner.require(&GitCommand::new(["checkout", base]))?;
        self.runner.require(&GitCommand::new([
            "reset".to_string(),
            "--hard".to_string(),
            upstream.tracking_ref(),
        ]))?;
        self.push_branch(base)?;

        Ok(())
    }

    /// Rebase every feature branch onto its base, dependencies first.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::Config`] if branch bases form a cycle.
    /// - Return [`ForkError::Git`] if any Git command fails, including a
    ///   rebase that runs into conflicts.
    #[instrument(skip(self), level = "debug")]
    pub fn rebase_branches(&self) -> Result<()> {
        info!("=== rebasing branches ===");

        for branch in self.config.rebase_order()? {
            info!("rebasing {} onto {}", branch.name, branch.base);
            self.runner
                .require(&GitCommand::new(["checkout", branch.name.as_str()]))?;
            self.runner
                .require(&GitCommand::new(["rebase", branch.base.as_str()]))?;
            self.push_branch(&branch.name)?;
        }

        Ok(())
    }

    /// Recreate fork branch from base, and merge in every feature branch in
    /// declaration order.
    ///
    /// Merge commits are dated with the newest commit date of their parents.
    /// Unchanged branches therefore rebuild the exact same fork branch.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::MergeConflict`] if a merge fails. The fork branch
    ///   is left mid-merge, and nothing more is merged or pushed.
    /// - Return [`ForkError::Git`] if any other Git command fails.
    #[instrument(skip(self), level = "debug")]
    pub fn build_fork(&self) -> Result<()> {
        info!("=== building {FORK_BRANCH} branch ===");

        self.runner
            .require(&GitCommand::new(["checkout", self.config.base.as_str()]))?;

        // INVARIANT: Fork branch may not exist yet, so failing to delete it is fine.
        let outcome = self
            .runner
            .mutate(&GitCommand::new(["branch", "-D", FORK_BRANCH]))?;
        if !outcome.is_success() {
            warn!("no existing {FORK_BRANCH} branch to delete");
        }

        self.runner
            .require(&GitCommand::new(["checkout", "-b", FORK_BRANCH]))?;

        for branch in &self.config.branches {
            info!("merging {}", branch.name);
            let time = self
                .runner
                .newest_commit_time(&["HEAD", branch.name.as_str()])?;
            let date = format!("@{time} +0000");
            let command = GitCommand::new(["merge", "--no-edit", branch.name.as_str()])
                .env("GIT_AUTHOR_DATE", &date)
                .env("GIT_COMMITTER_DATE", &date);

            let outcome = self.runner.mutate(&command)?;
            if !outcome.is_success() {
                error!("merge conflict while merging {}", branch.name);
                error!("resolve conflicts, then run: git merge --continue");
                error!(
                    "or abort with: git merge --abort && git checkout {}",
                    self.original_head
                );
                return Err(ForkError::MergeConflict {
                    branch: branch.name.clone(),
                    original_head: self.original_head.clone(),
                });
            }
        }

        self.push_branch(&fork_ref())?;

        Ok(())
    }

    /// Tag fork branch if it changed since the run started.
    ///
    /// Returns the tag that was made. In dry-run mode the change check is
    /// skipped, and the tag that would be made is returned instead.
    ///
    /// # Errors
    ///
    /// - Return [`ForkError::Metadata`] if project version cannot be read.
    /// - Return [`ForkError::Git`] if any Git command fails.
    #[instrument(skip(self), level = "debug")]
    pub fn tag_fork(&self, old_fork: Option<&CommitId>) -> Result<Option<ForkTag>> {
        if !self.runner.is_dry_run() {
            let new_fork = self.runner.resolve(&fork_ref())?;
            if new_fork.as_ref() == old_fork {
                info!("=== no changes detected, skipping tag ===");
                return Ok(None);
            }
        }

        let metadata = ProjectMetadata::locate(&self.root)?;
        let existing = self.runner.list_tags(&ForkTag::glob(&metadata.version))?;
        let tag = ForkTag::next(metadata.version, existing)?;
        let name = tag.to_string();

        info!("=== tagging {FORK_BRANCH} as {name} ===");
        self.runner
            .require(&GitCommand::new(["tag".to_string(), name.clone(), fork_ref()]))?;
        self.runner
            .require(&GitCommand::new(["push", ORIGIN, name.as_str()]))?;

        Ok(Some(tag))
    }

    fn push_branch(&self, branch: &str) -> Result<()> {
        self.runner
            .require(&GitCommand::new(["push", ORIGIN, branch, "--force-with-lease"]))?;
        Ok(())
    }

    fn summarize(&self, report: &RunReport) {
        info!("=== done! ===");

        let base = self.config.base.as_str();
        match self.runner.log_oneline(base, &fork_ref()) {
            Ok(log) => info!("commits in {FORK_BRANCH} ahead of {base}:\n{log}"),
            Err(error) => warn!("cannot list commits in {FORK_BRANCH} ahead of {base}: {error}"),
        }

        match (&report.tag, report.dry_run) {
            (Some(tag), false) => info!("tagged as: {tag}"),
            (Some(tag), true) => info!("would tag as: {tag}"),
            (None, _) => {}
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RunReport {
    /// Tag made for the fork branch, or the tag that would be made in a dry
    /// run.
    pub tag: Option<ForkTag>,

    /// Whether mutations were only printed.
    pub dry_run: bool,
}

fn fork_ref() -> String {
    format!("refs/heads/{FORK_BRANCH}")
}

/// Fork orchestration error types.
#[derive(Debug, thiserror::Error)]
pub enum ForkError {
    /// Working tree has uncommitted changes.
    #[error("you have uncommitted changes, please commit or stash them first")]
    DirtyWorkTree,

    /// Merging a feature branch into the fork branch failed.
    ///
    /// Carries the branch or commit the user was on before the run.
    #[error("merge conflict while merging {branch} into {}", FORK_BRANCH)]
    MergeConflict { branch: String, original_head: String },

    /// Fork configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Git command failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Project version lookup failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// No fork tag can be made.
    #[error(transparent)]
    Tag(#[from] TagError),
}

/// Friendly result alias :3
type Result<T, E = ForkError> = std::result::Result<T, E>;
