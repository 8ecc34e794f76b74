//! Project-level error types: root discovery, configuration, path helpers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    /// The working directory could not be determined.
    #[error("failed to resolve absolute path: {source}")]
    CurrentDir {
        #[source]
        source: std::io::Error,
    },

    /// A config file exists but could not be read or parsed.
    #[error("failed to parse {file}: {reason}")]
    Config { file: String, reason: String },

    /// The path escapes the project root.
    #[error("path is outside the project root: {path}")]
    PathOutsideRoot { path: String },

    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("path is a directory, not a file: {path}")]
    IsDirectory { path: String },

    /// `read_file_range` got a start line after its (clamped) end line.
    #[error("invalid range: start line {start} is after end line {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProjectError {
    pub(crate) fn io(action: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        ProjectError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
