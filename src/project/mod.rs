//! Project context: root discovery, configuration, and path helpers.

pub mod config;
pub mod errors;
pub mod paths;

use std::path::{Path, PathBuf};

pub use config::Config;
pub use errors::ProjectError;
pub use paths::{resolve_path, should_ignore, should_ignore_dir};

/// Walk upward from `start` to the nearest directory containing a `.git`
/// directory, `.axon.yml` or `.axon.yaml`.
///
/// Falls back to the absolute form of `start` when no marker is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ProjectError> {
    let absolute = if start.is_absolute() {
        paths::normalize(start)
    } else {
        let cwd = std::env::current_dir().map_err(|source| ProjectError::CurrentDir { source })?;
        paths::normalize(&cwd.join(start))
    };

    let mut dir = absolute.as_path();
    loop {
        if is_project_root(dir) {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    Ok(absolute)
}

fn is_project_root(dir: &Path) -> bool {
    dir.join(".git").is_dir()
        || config::CONFIG_FILE_NAMES
            .iter()
            .any(|name| dir.join(name).exists())
}
