//! Layered load/validate of the repository-set config file, grounded on the
//! teacher's defaults → system → user → workspace merge algorithm — scaled
//! down here to the two layers this system actually needs (a single
//! repositories file plus environment-variable overrides for secrets).

use std::path::{Path, PathBuf};

use cyrus_core::Repository;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Deserialize)]
struct RepositoryFile {
    #[serde(default)]
    repositories: Vec<Repository>,
}

/// Read and validate a repository-set config file at `path`.
///
/// # Errors
/// Returns an error if the file cannot be read, fails to parse as TOML, or
/// a repository entry is missing a required field or is named more than
/// once.
pub async fn load(path: &Path) -> ConfigResult<Vec<Repository>> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse(&body, path)
}

fn parse(body: &str, path: &Path) -> ConfigResult<Vec<Repository>> {
    let file: RepositoryFile = toml::from_str(body).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&file.repositories)?;
    Ok(file.repositories)
}

fn validate(repositories: &[Repository]) -> ConfigResult<()> {
    let mut seen = std::collections::HashSet::new();
    for repo in repositories {
        if repo.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("repository {} has an empty name", repo.id)));
        }
        if repo.base_branch.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("repository {} has an empty baseBranch", repo.id)));
        }
        if !seen.insert(repo.id.clone()) {
            return Err(ConfigError::Invalid(format!("duplicate repository id {}", repo.id)));
        }
    }
    Ok(())
}

/// The default location for the repository-set config file:
/// `<cyrusHome>/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "cyrus").map(|dirs| dirs.config_dir().join("config.toml"))
}
