//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur during a model call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The model endpoint did not respond within the client-side deadline.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx status, or an `error` object in the body.
    #[error("HTTP {status}: {message}")]
    Protocol { status: u16, message: String },

    /// Response body was not the JSON we expected.
    #[error("failed to decode response: {reason}")]
    Decode { reason: String },

    /// The response carried zero choices.
    #[error("no choices in response")]
    EmptyResponse,

    /// The stream broke after it had started delivering data.
    #[error("stream interrupted: {reason}")]
    StreamInterrupted { reason: String, partial_text: String },

    /// The caller's text callback failed; the stream was abandoned.
    #[error("output callback failed: {reason}")]
    CallbackFailed { reason: String },
}

impl InferenceError {
    /// Text streamed before the failure, if any was received.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            InferenceError::StreamInterrupted { partial_text, .. } if !partial_text.is_empty() => {
                Some(partial_text)
            }
            _ => None,
        }
    }
}
