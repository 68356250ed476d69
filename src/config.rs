// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the fork configuration file that forkup reads from
//! the top-level of the repository it maintains. The configuration names the
//! upstream to track, the local base branch mirroring it, and the ordered
//! listing of feature branches layered on top of that base.
//!
//! # General Layout
//!
//! ```yaml
//! upstream:
//!   remote: upstream
//!   branch: main
//! base: main
//! branches:
//!   - name: feat-a
//!     base: main
//!     description: First feature.
//!   - name: feat-b
//!     base: feat-a
//! ```
//!
//! The order of the `branches` listing matters. It is the order in which
//! feature branches get merged into the fork branch. Rebasing follows the
//! dependency order implied by each entry's `base` instead, see [`order`].

pub mod order;

use crate::fork::FORK_BRANCH;

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Fork configuration layout.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ForkConfig {
    /// Upstream remote and branch to track.
    pub upstream: UpstreamRef,

    /// Local branch mirroring upstream's tip.
    pub base: String,

    /// Feature branches in merge order.
    #[serde(default)]
    pub branches: Vec<BranchSpec>,
}

impl ForkConfig {
    /// Load fork configuration from file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NotFound`] if file does not exist.
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return any error of [`ForkConfig::from_str`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        data.parse()
    }

    /// Feature branches in the order they must be rebased.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Cycle`] if branch bases form a cycle.
    pub fn rebase_order(&self) -> Result<Vec<&BranchSpec>> {
        order::rebase_order(&self.base, &self.branches)
    }

    fn validate(&self) -> Result<()> {
        if self.upstream.remote.is_empty() {
            return Err(ConfigError::EmptyField("upstream.remote".into()));
        }

        if self.upstream.branch.is_empty() {
            return Err(ConfigError::EmptyField("upstream.branch".into()));
        }

        if self.base.is_empty() {
            return Err(ConfigError::EmptyField("base".into()));
        }

        let mut seen = HashSet::new();
        for (index, branch) in self.branches.iter().enumerate() {
            if branch.name.is_empty() {
                return Err(ConfigError::EmptyField(format!("branches[{index}].name")));
            }

            if branch.base.is_empty() {
                return Err(ConfigError::EmptyField(format!("branches[{index}].base")));
            }

            if branch.name == FORK_BRANCH || branch.name == self.base {
                return Err(ConfigError::ReservedBranch(branch.name.clone()));
            }

            if !seen.insert(branch.name.as_str()) {
                return Err(ConfigError::DuplicateBranch(branch.name.clone()));
            }
        }

        self.rebase_order()?;

        Ok(())
    }
}

impl FromStr for ForkConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let config: ForkConfig = serde_yaml::from_str(data)?;

        // INVARIANT: Never hand out a configuration that cannot be ordered.
        config.validate()?;

        Ok(config)
    }
}

impl Display for ForkConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            serde_yaml::to_string(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Upstream source of truth.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct UpstreamRef {
    /// Name of upstream remote, e.g., "upstream".
    pub remote: String,

    /// Branch of upstream remote to track.
    pub branch: String,
}

impl UpstreamRef {
    /// Remote-tracking name of upstream branch, e.g., "upstream/main".
    pub fn tracking_ref(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

impl Display for UpstreamRef {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.tracking_ref().as_str())
    }
}

/// Feature branch entry.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BranchSpec {
    /// Local branch to rebase and merge.
    pub name: String,

    /// Branch to rebase onto. Either the shared base or another entry.
    pub base: String,

    /// Brief description of what the branch carries.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("configuration file {0:?} not found")]
    NotFound(PathBuf),

    /// Configuration file exists but cannot be read.
    #[error("failed to read configuration file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to deserialize configuration, e.g., required field missing.
    #[error(transparent)]
    Deserialize(#[from] serde_yaml::Error),

    /// Failed to serialize configuration.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// Required field is present but empty.
    #[error("configuration field {0} must not be empty")]
    EmptyField(String),

    /// Feature branch listed more than once.
    #[error("branch {0:?} listed more than once")]
    DuplicateBranch(String),

    /// Feature branch collides with a branch forkup manages itself.
    #[error("branch {0:?} is managed by forkup and cannot be listed as a feature branch")]
    ReservedBranch(String),

    /// Branch bases depend on each other in a loop.
    #[error("branch bases form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn branch(name: &str, base: &str, description: &str) -> BranchSpec {
        BranchSpec {
            name: name.into(),
            base: base.into(),
            description: description.into(),
        }
    }

    #[test]
    fn deserialize_fork_config() -> anyhow::Result<()> {
        let result: ForkConfig = indoc! {r#"
            upstream:
              remote: upstream
              branch: dev
            base: main
            branches:
              - name: feat-a
                base: main
                description: Adds feature A.
              - { name: feat-b, base: feat-a }
        "#}
        .parse()?;

        let expect = ForkConfig {
            upstream: UpstreamRef {
                remote: "upstream".into(),
                branch: "dev".into(),
            },
            base: "main".into(),
            branches: vec![
                branch("feat-a", "main", "Adds feature A."),
                branch("feat-b", "feat-a", ""),
            ],
        };

        assert_eq!(result, expect);
        assert_eq!(result.upstream.tracking_ref(), "upstream/dev");

        Ok(())
    }

    #[test]
    fn deserialize_fork_config_without_branches() -> anyhow::Result<()> {
        let result: ForkConfig = indoc! {r#"
            upstream: { remote: upstream, branch: main }
            base: main
        "#}
        .parse()?;

        assert!(result.branches.is_empty());

        Ok(())
    }

    #[test]
    fn serialize_fork_config() {
        let result = ForkConfig {
            upstream: UpstreamRef {
                remote: "upstream".into(),
                branch: "main".into(),
            },
            base: "main".into(),
            branches: vec![
                branch("feat-a", "main", "Adds feature A."),
                branch("feat-b", "feat-a", ""),
            ],
        }
        .to_string();

        let expect = indoc! {r#"
            upstream:
              remote: upstream
              branch: main
            base: main
            branches:
            - name: feat-a
              base: main
              description: Adds feature A.
            - name: feat-b
              base: feat-a
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn reject_missing_required_fields() {
        let result = indoc! {r#"
            upstream: { remote: upstream }
            base: main
        "#}
        .parse::<ForkConfig>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));

        let result = indoc! {r#"
            upstream: { remote: upstream, branch: main }
            branches: []
        "#}
        .parse::<ForkConfig>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn reject_invalid_branch_listing() {
        let result = indoc! {r#"
            upstream: { remote: upstream, branch: main }
            base: main
            branches:
              - { name: feat-a, base: main }
              - { name: feat-a, base: main }
        "#}
        .parse::<ForkConfig>();
        assert!(matches!(result, Err(ConfigError::DuplicateBranch(name)) if name == "feat-a"));

        let result = indoc! {r#"
            upstream: { remote: upstream, branch: main }
            base: main
            branches:
              - { name: fork, base: main }
        "#}
        .parse::<ForkConfig>();
        assert!(matches!(result, Err(ConfigError::ReservedBranch(name)) if name == "fork"));

        let result = indoc! {r#"
            upstream: { remote: upstream, branch: main }
            base: main
            branches:
              - { name: "", base: main }
        "#}
        .parse::<ForkConfig>();
        assert!(matches!(result, Err(ConfigError::EmptyField(field)) if field == "branches[0].name"));
    }

    #[test]
    fn reject_cyclic_branch_bases() {
        let result = indoc! {r#"
            upstream: { remote: upstream, branch: main }
            base: main
            branches:
              - { name: feat-a, base: feat-b }
              - { name: feat-b, base: feat-a }
        "#}
        .parse::<ForkConfig>();

        match result {
            Err(ConfigError::Cycle(path)) => {
                assert_eq!(path, vec!["feat-a", "feat-b", "feat-a"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[sealed_test]
    fn load_fork_config_from_file() -> anyhow::Result<()> {
        let result = ForkConfig::load("fork.yaml");
        assert!(matches!(result, Err(ConfigError::NotFound(path)) if path == Path::new("fork.yaml")));

        fs::write(
            "fork.yaml",
            indoc! {r#"
                upstream: { remote: upstream, branch: main }
                base: main
                branches:
                  - { name: feat-a, base: main }
            "#},
        )?;
        let result = ForkConfig::load("fork.yaml")?;
        assert_eq!(result.branches, vec![branch("feat-a", "main", "")]);

        Ok(())
    }
}
