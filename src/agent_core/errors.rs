//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that end a conversation turn.
///
/// Tool execution failures are not here: they become tool results the model
/// can read and react to.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model kept calling tools for the whole round budget.
    #[error("maximum tool-call rounds exceeded ({rounds})")]
    MaxIterationsExceeded { rounds: usize },

    /// A tool call's argument text is not a JSON object.
    #[error("invalid arguments for tool '{tool}': {reason} (raw: {raw})")]
    ToolArgumentError {
        tool: String,
        raw: String,
        reason: String,
    },

    /// The model answered with no text where text was required.
    #[error("model returned an empty answer")]
    EmptyAnswer,

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl AgentError {
    /// Text streamed before a transport failure, if any.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            AgentError::Inference(e) => e.partial_text(),
            _ => None,
        }
    }
}
