// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Rebase ordering of feature branches.
//!
//! A feature branch must be rebased only after the branch it is based on has
//! been rebased itself. Each entry names exactly one base, so dependencies
//! form chains that lead back to the shared base branch (or to some ref that
//! is not listed at all). Ordering walks each chain down to its first already
//! placed entry, then places the chain bottom-up. Entries without a listed
//! dependency keep their declaration order.

use crate::config::{BranchSpec, ConfigError};

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Order feature branches such that every branch follows its dependency.
///
/// Stable with respect to declaration order: independent branches are placed
/// in the order they are listed, and each branch is placed exactly once.
///
/// # Errors
///
/// - Return [`ConfigError::Cycle`] if bases form a cycle. The cycle is
///   reported as the path of branch names that closes on itself.
pub fn rebase_order<'a>(
    base: &str,
    branches: &'a [BranchSpec],
) -> Result<Vec<&'a BranchSpec>, ConfigError> {
    let index: HashMap<&str, &BranchSpec> = branches
        .iter()
        .map(|branch| (branch.name.as_str(), branch))
        .collect();
    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(branches.len());
    let mut order = Vec::with_capacity(branches.len());

    for branch in branches {
        let mut chain: Vec<&BranchSpec> = Vec::new();
        let mut current = Some(branch);

        while let Some(spec) = current {
            match marks.get(spec.name.as_str()) {
                Some(Mark::Done) => break,
                Some(Mark::Visiting) => {
                    // INVARIANT: Only the current chain can still be marked as visiting.
                    let start = chain
                        .iter()
                        .position(|visited| visited.name == spec.name)
                        .unwrap_or_default();
                    let mut cycle: Vec<String> =
                        chain[start..].iter().map(|visited| visited.name.clone()).collect();
                    cycle.push(spec.name.clone());
                    return Err(ConfigError::Cycle(cycle));
                }
                None => {}
            }

            marks.insert(spec.name.as_str(), Mark::Visiting);
            chain.push(spec);
            current = match spec.base.as_str() {
                name if name == base => None,
                name => index.get(name).copied(),
            };
        }

        for spec in chain.into_iter().rev() {
            marks.insert(spec.name.as_str(), Mark::Done);
            order.push(spec);
        }
    }

    Ok(order)
}
