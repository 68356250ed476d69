// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Maintain a fork branch on top of an upstream project.
//!
//! Forkup keeps a long-lived __fork branch__ in sync with an upstream project
//! while layering a set of local feature branches on top of it. See [`fork`]
//! for the workflow, and [`config`] for the configuration layout.

pub mod config;
pub mod fork;
pub mod git;
pub mod metadata;
pub mod path;
pub mod tag;

pub use config::{BranchSpec, ForkConfig, UpstreamRef};
pub use fork::{ForkError, Forkup, RunReport};
pub use git::{Git, GitBinary, GitRunner};
pub use tag::ForkTag;
