// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fork tag naming.
//!
//! A __fork tag__ marks a point where the fork branch changed. Fork tags take
//! the form `<version>-fork.<n>`, where `<version>` is the version of the
//! forked project and `<n>` counts up from 1 for every fork tag made on top of
//! that version. Existing fork tags are never rewritten, so the next number is
//! always one past the highest number already taken.

use glob::Pattern;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Version-stamped, numbered fork tag.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ForkTag {
    version: String,
    number: u64,
}

impl ForkTag {
    /// Construct new fork tag.
    pub fn new(version: impl Into<String>, number: u64) -> Self {
        Self {
            version: version.into(),
            number,
        }
    }

    /// Determine next fork tag for version given the tags that already exist.
    ///
    /// Tags that do not exactly match `<version>-fork.<digits>` are ignored.
    ///
    /// # Errors
    ///
    /// - Return [`TagError::Exhausted`] if the highest existing fork number
    ///   cannot be counted past.
    pub fn next(
        version: impl Into<String>,
        existing: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, TagError> {
        let version = version.into();
        let highest = existing
            .into_iter()
            .filter_map(|tag| Self::parse_number(&version, tag.as_ref()))
            .max()
            .unwrap_or(0);

        match highest.checked_add(1) {
            Some(number) => Ok(Self::new(version, number)),
            None => Err(TagError::Exhausted(version)),
        }
    }

    /// Glob matching every candidate fork tag of version.
    ///
    /// Special glob characters in the version are escaped so they only match
    /// themselves.
    pub fn glob(version: impl AsRef<str>) -> String {
        format!("{}-fork.*", Pattern::escape(version.as_ref()))
    }

    /// Extract fork number from tag name if it is a fork tag of version.
    pub fn parse_number(version: &str, tag: &str) -> Option<u64> {
        let digits = tag.strip_prefix(version)?.strip_prefix("-fork.")?;
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }

        digits.parse().ok()
    }

    /// Version the tag is stamped with.
    pub fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Fork number of the tag.
    pub fn number(&self) -> u64 {
        self.number
    }
}

impl Display for ForkTag {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}-fork.{}", self.version, self.number)
    }
}

/// Fork tag error types.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// Fork numbers of version ran out.
    #[error("no fork number left for version {0}")]
    Exhausted(String),
}
