//! Tool execution error types.
//!
//! Every variant is recoverable: the executor folds the message into the
//! tool result the model sees, and the conversation carries on.

use thiserror::Error;

use crate::indexer::IndexError;
use crate::project::ProjectError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{argument} argument is required")]
    MissingArgument { argument: &'static str },

    #[error("invalid {argument}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("path is outside the project root: {path}")]
    PathOutsideRoot { path: String },

    #[error("path is ignored by project configuration: {path}")]
    Ignored { path: String },

    /// `what` names the expected kind of entry, e.g. "file" or "directory".
    #[error("{what} does not exist: {path}")]
    NotFound { what: &'static str, path: String },

    #[error("file already exists: {path}")]
    AlreadyExists { path: String },

    #[error("path is not a directory: {path}")]
    NotADirectory { path: String },

    #[error("path is a directory, not a file: {path}")]
    IsDirectory { path: String },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("not a git repository")]
    NotGitRepository,

    #[error("project index not available")]
    IndexUnavailable,

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("failed to get confirmation: {reason}")]
    Confirmation { reason: String },
}

impl ToolError {
    pub(crate) fn io(action: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

impl From<ProjectError> for ToolError {
    fn from(e: ProjectError) -> Self {
        match e {
            ProjectError::PathOutsideRoot { path } => ToolError::PathOutsideRoot { path },
            ProjectError::NotFound { path } => ToolError::NotFound { what: "file", path },
            ProjectError::IsDirectory { path } => ToolError::IsDirectory { path },
            ProjectError::Io {
                action,
                path,
                source,
            } => ToolError::Io {
                action,
                path,
                source,
            },
            ProjectError::InvalidRange { start, end } => ToolError::InvalidArgument {
                argument: "range".to_string(),
                reason: format!("start line {start} is after end line {end}"),
            },
            other => ToolError::InvalidArgument {
                argument: "path".to_string(),
                reason: other.to_string(),
            },
        }
    }
}
