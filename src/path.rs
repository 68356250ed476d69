// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the repository forkup maintains lives, and where its
//! well-known files are inside of it.

use git2::Repository;
use std::path::{Path, PathBuf};

/// Name of fork configuration file at the top-level of the repository.
pub const FORK_CONFIG_FILE: &str = "fork.yaml";

/// Determine absolute path to top-level of repository containing `start`.
///
/// Walks up from `start` through its parent directories until a repository
/// is found.
///
/// # Errors
///
/// - Return [`PathError::Discover`] if no repository can be found.
/// - Return [`PathError::Bare`] if repository has no working tree.
pub fn repository_root(start: impl AsRef<Path>) -> Result<PathBuf> {
    let repository = Repository::discover(start.as_ref())?;
    repository
        .workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| PathError::Bare(repository.path().to_path_buf()))
}

/// Determine path to fork configuration file of repository.
///
/// Does not check if the path returned actually exists.
pub fn fork_config_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(FORK_CONFIG_FILE)
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No repository found.
    #[error("cannot find git repository")]
    Discover(#[from] git2::Error),

    /// Repository found, but it is bare.
    #[error("repository {0:?} is bare, forkup needs a working tree")]
    Bare(PathBuf),
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
