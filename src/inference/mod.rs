//! Inference client for the local llama-server.
//!
//! This module handles all communication with the model endpoint:
//! - Streaming and non-streaming chat completions
//! - SSE line splitting and tool call fragment assembly
//! - The transport error taxonomy
//!
//! The client speaks the OpenAI Chat Completions API, so any compatible
//! server can stand in for llama-server.

pub mod client;
pub mod errors;
pub mod streaming;
pub mod types;

// Re-exports for convenience
pub use client::{ChatBackend, InferenceClient};
pub use errors::InferenceError;
pub use streaming::{merge_tool_call_fragment, StreamState, TextSink};
pub use types::{AssembledTurn, ChatMessage, Role, ToolCall, ToolCallFragment, ToolDefinition};
