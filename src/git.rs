// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control collaborator.
//!
//! Forkup never touches the branch/commit graph itself. Every fetch, rebase,
//! merge, push, and tag is delegated to Git through the [`Git`] trait, which
//! simply runs a command and reports how it went. The [`GitBinary`]
//! implementation calls the `git` executable on the user's system.
//!
//! Commands come in two flavors: __mutations__ that change repository state,
//! and __queries__ that only read it. All commands go through [`GitRunner`],
//! which is the single place deciding whether a mutation actually runs. In
//! dry-run mode mutations are printed and reported as successful without
//! running, while queries always run so previews reflect the real state of
//! the repository.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
    process::{Command, Stdio},
};
use tracing::{debug, info, instrument};

/// Git command line arguments, without the `git` executable itself.
///
/// May carry extra environment variables for the Git process, e.g., fixed
/// commit dates.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GitCommand {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl GitCommand {
    /// Construct new Git command from arguments.
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
        }
    }

    /// Set environment variable for the Git process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Arguments passed to Git.
    pub fn args(&self) -> &[String] {
        self.args.as_slice()
    }

    /// Extra environment variables of the Git process.
    pub fn envs(&self) -> &[(String, String)] {
        self.envs.as_slice()
    }
}

impl Display for GitCommand {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str("git")?;
        for arg in &self.args {
            write!(fmt, " {arg}")?;
        }

        Ok(())
    }
}

/// Result of running a Git command.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Outcome {
    /// Exit code, or nothing if the process was killed by a signal.
    pub code: Option<i32>,

    /// Captured standard output. Empty for mutations.
    pub stdout: String,

    /// Captured standard error. Empty for mutations.
    pub stderr: String,
}

impl Outcome {
    /// Successful outcome without output.
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    /// Failed outcome with given exit code.
    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    /// Did the command exit successfully?
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Opaque commit identifier, i.e., a content hash.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct CommitId(String);

impl CommitId {
    /// Construct new commit identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Treat commit identifier as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CommitId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.0.as_str())
    }
}

/// Layer of indirection for running Git commands.
pub trait Git {
    /// Run mutating command with its output going straight to the terminal.
    ///
    /// A non-zero exit is not an error at this level. Only failure to run
    /// the command at all is.
    fn execute(&self, command: &GitCommand) -> Result<Outcome>;

    /// Run read-only command and capture its output.
    fn query(&self, command: &GitCommand) -> Result<Outcome>;
}

/// Git access through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitBinary {
    root: PathBuf,
}

impl GitBinary {
    /// Construct new Git executable runner operating on repository at root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn command(&self, command: &GitCommand) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(self.root.as_os_str())
            .args(command.args())
            .envs(command.envs().iter().map(|(key, value)| (key, value)));
        cmd
    }
}

impl Git for GitBinary {
    fn execute(&self, command: &GitCommand) -> Result<Outcome> {
        let status = self
            .command(command)
            .spawn()
            .and_then(|mut child| child.wait())
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok(Outcome {
            code: status.code(),
            ..Default::default()
        })
    }

    fn query(&self, command: &GitCommand) -> Result<Outcome> {
        let output = self
            .command(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok(Outcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(output.stdout.as_slice()).into_owned(),
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        })
    }
}

/// Single command execution path shared by real runs and dry runs.
#[derive(Debug)]
pub struct GitRunner<G = GitBinary>
where
    G: Git,
{
    git: G,
    dry_run: bool,
}

impl<G> GitRunner<G>
where
    G: Git,
{
    /// Construct new runner.
    pub fn new(git: G, dry_run: bool) -> Self {
        Self { git, dry_run }
    }

    /// Is the runner only printing mutations?
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Underlying Git access.
    pub fn git(&self) -> &G {
        &self.git
    }

    /// Run mutating command, or only print it in dry-run mode.
    ///
    /// Hands back the outcome as-is so the caller can inspect failure.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Spawn`] if command cannot be run.
    pub fn mutate(&self, command: &GitCommand) -> Result<Outcome> {
        if self.dry_run {
            info!("[dry-run] {command}");
            return Ok(Outcome::success());
        }

        info!("$ {command}");
        self.git.execute(command)
    }

    /// Run mutating command that must succeed.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if command exits unsuccessfully.
    /// - Return [`GitError::Spawn`] if command cannot be run.
    pub fn require(&self, command: &GitCommand) -> Result<()> {
        let outcome = self.mutate(command)?;
        if !outcome.is_success() {
            return Err(GitError::Command {
                command: command.clone(),
                code: outcome.code,
                stderr: outcome.stderr,
            });
        }

        Ok(())
    }

    /// Run read-only command. Always runs, even in dry-run mode.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Spawn`] if command cannot be run.
    pub fn query(&self, command: &GitCommand) -> Result<Outcome> {
        debug!("query {command}");
        self.git.query(command)
    }

    /// Run read-only command that must succeed, returning trimmed stdout.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if command exits unsuccessfully.
    /// - Return [`GitError::Spawn`] if command cannot be run.
    pub fn query_required(&self, command: &GitCommand) -> Result<String> {
        let outcome = self.query(command)?;
        if !outcome.is_success() {
            return Err(GitError::Command {
                command: command.clone(),
                code: outcome.code,
                stderr: outcome.stderr,
            });
        }

        Ok(outcome.stdout.trim().to_string())
    }

    /// Name of currently checked out branch.
    ///
    /// Empty if HEAD is detached.
    #[instrument(skip(self), level = "debug")]
    pub fn current_branch(&self) -> Result<String> {
        self.query_required(&GitCommand::new(["branch", "--show-current"]))
    }

    /// Resolve reference to commit identifier, if reference exists.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self, reference: &str) -> Result<Option<CommitId>> {
        let outcome = self.query(&GitCommand::new([
            "rev-parse",
            "--verify",
            "--quiet",
            reference,
        ]))?;

        let id = outcome.stdout.trim();
        if !outcome.is_success() || id.is_empty() {
            return Ok(None);
        }

        Ok(Some(CommitId::new(id)))
    }

    /// Check if working tree differs from current commit.
    ///
    /// Untracked files do not count as changes.
    #[instrument(skip(self), level = "debug")]
    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        let outcome = self.query(&GitCommand::new(["diff-index", "--quiet", "HEAD", "--"]))?;
        Ok(!outcome.is_success())
    }

    /// List tag names matching glob.
    #[instrument(skip(self), level = "debug")]
    pub fn list_tags(&self, glob: &str) -> Result<Vec<String>> {
        let stdout = self.query_required(&GitCommand::new(["tag", "-l", glob]))?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Committer timestamp of the newest commit reachable from any revision.
    ///
    /// Seconds since the Unix epoch.
    #[instrument(skip(self), level = "debug")]
    pub fn newest_commit_time(&self, revisions: &[&str]) -> Result<i64> {
        let command = GitCommand::new(
            ["log", "-1", "--format=%ct"]
                .into_iter()
                .chain(revisions.iter().copied()),
        );
        let stdout = self.query_required(&command)?;
        stdout.parse().map_err(|_| GitError::Unexpected {
            command,
            output: stdout,
        })
    }

    /// One line per commit reachable from `to` but not from `from`.
    #[instrument(skip(self), level = "debug")]
    pub fn log_oneline(&self, from: &str, to: &str) -> Result<String> {
        self.query_required(&GitCommand::new([
            "log".to_string(),
            "--oneline".to_string(),
            format!("{from}..{to}"),
        ]))
    }
}

/// Git error types.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Git executable could not be run at all.
    #[error("failed to run {command}")]
    Spawn {
        command: GitCommand,
        #[source]
        source: std::io::Error,
    },

    /// Required Git command exited unsuccessfully.
    #[error("{command} failed with {}{}", exit_code(.code), stderr_suffix(.stderr))]
    Command {
        command: GitCommand,
        code: Option<i32>,
        stderr: String,
    },

    /// Git command printed something forkup cannot make sense of.
    #[error("{command} gave unexpected output {output:?}")]
    Unexpected { command: GitCommand, output: String },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".into(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        message => format!(":\n{message}"),
    }
}

/// Friendly result alias :3
type Result<T, E = GitError> = std::result::Result<T, E>;
