// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project metadata lookup.
//!
//! Fork tags are stamped with the version of the project being forked. That
//! version comes from the project's own manifest at the top-level of the
//! repository: `package.json` is preferred, and `Cargo.toml` is used when no
//! `package.json` exists.

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Version information of the forked project.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProjectMetadata {
    /// Version string, e.g., "1.2.0".
    pub version: String,

    /// Manifest the version was read from.
    pub source: PathBuf,
}

impl ProjectMetadata {
    /// Locate project manifest in target directory and read its version.
    ///
    /// # Errors
    ///
    /// - Return [`MetadataError::NotFound`] if no manifest exists.
    /// - Return [`MetadataError::MissingVersion`] if manifest has no version.
    /// - Return other variants of [`MetadataError`] if manifest cannot be read
    ///   or parsed.
    pub fn locate(root: impl AsRef<Path>) -> Result<Self> {
        let package_json = root.as_ref().join("package.json");
        if package_json.exists() {
            debug!("read version from {}", package_json.display());
            let data = read(&package_json)?;
            let version = version_from_package_json(&data)?
                .ok_or_else(|| MetadataError::MissingVersion(package_json.clone()))?;
            return Ok(Self {
                version,
                source: package_json,
            });
        }

        let cargo_toml = root.as_ref().join("Cargo.toml");
        if cargo_toml.exists() {
            debug!("read version from {}", cargo_toml.display());
            let data = read(&cargo_toml)?;
            let version = version_from_cargo_toml(&data)?
                .ok_or_else(|| MetadataError::MissingVersion(cargo_toml.clone()))?;
            return Ok(Self {
                version,
                source: cargo_toml,
            });
        }

        Err(MetadataError::NotFound(root.as_ref().to_path_buf()))
    }
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CargoManifest {
    package: Option<CargoPackage>,
    workspace: Option<CargoWorkspace>,
}

#[derive(Debug, Deserialize)]
struct CargoPackage {
    version: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct CargoWorkspace {
    package: Option<CargoWorkspacePackage>,
}

#[derive(Debug, Deserialize)]
struct CargoWorkspacePackage {
    version: Option<String>,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn version_from_package_json(data: &str) -> Result<Option<String>> {
    let package: PackageJson = serde_json::from_str(data)?;
    Ok(package.version)
}

fn version_from_cargo_toml(data: &str) -> Result<Option<String>> {
    let manifest: CargoManifest = toml::from_str(data)?;
    let workspace_version = manifest
        .workspace
        .and_then(|workspace| workspace.package)
        .and_then(|package| package.version);

    // INVARIANT: `version.workspace = true` defers to the workspace version.
    let version = match manifest.package.and_then(|package| package.version) {
        Some(toml::Value::String(version)) => Some(version),
        Some(_) | None => workspace_version,
    };

    Ok(version)
}

/// Project metadata error types.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No project manifest in repository root.
    #[error("no package.json or Cargo.toml found in {0:?}")]
    NotFound(PathBuf),

    /// Project manifest cannot be read.
    #[error("failed to read project manifest {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Project manifest lacks a version field.
    #[error("project manifest {0:?} does not declare a version")]
    MissingVersion(PathBuf),

    /// Failed to parse `package.json`.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Failed to parse `Cargo.toml`.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Friendly result alias :3
type Result<T, E = MetadataError> = std::result::Result<T, E>;
