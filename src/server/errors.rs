//! Server lifecycle error types.

use thiserror::Error;

/// Errors from starting, waiting on, or stopping llama-server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server binary could not be launched.
    #[error("failed to start {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The server never answered its readiness check.
    #[error("timeout waiting for server to be ready (waited {waited})")]
    NotReady { waited: String },

    /// The process could not be signalled or killed.
    #[error("failed to stop server: {reason}")]
    StopFailed { reason: String },

    /// The model menu was aborted or answered with nonsense.
    #[error("model selection failed: {reason}")]
    Selection { reason: String },
}
