//! Orchestrator: the tool-calling conversation loop.
//!
//! One orchestrator owns one conversation's history. Each user turn runs:
//!
//! ```text
//! AwaitingModel ──(tool calls)──► ExecutingTools ──► AwaitingModel ──► … ──► Done
//!       └──────────(no tool calls)──────────────────────────────────────────► Done
//! ```
//!
//! bounded by [`MAX_TOOL_ROUNDS`]. Every round sends the full history; nothing
//! is windowed or summarized.
//!
//! History is only ever extended in whole units (the user message, then one
//! assistant message with its tool results per round). A turn that fails is
//! truncated back to where it started, so the next attempt starts clean.

use std::sync::Arc;

use serde_json::Value;

use crate::inference::{AssembledTurn, ChatBackend, ChatMessage, InferenceError, TextSink};
use crate::inference::{ToolCall, ToolDefinition};

use super::errors::AgentError;
use super::tool_router::ToolDispatch;

/// Model calls allowed per user turn while the model keeps requesting tools.
pub const MAX_TOOL_ROUNDS: usize = 10;

pub struct Orchestrator {
    backend: Arc<dyn ChatBackend>,
    dispatcher: Box<dyn ToolDispatch>,
    tools: Vec<ToolDefinition>,
    history: Vec<ChatMessage>,
}

impl Orchestrator {
    pub fn new(
        system_prompt: impl Into<String>,
        backend: Arc<dyn ChatBackend>,
        dispatcher: Box<dyn ToolDispatch>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            tools,
            history: vec![ChatMessage::system(system_prompt)],
        }
    }

    /// Conversation so far, system prompt first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Drop everything but the system prompt and forget session grants.
    pub fn reset(&mut self) {
        self.history.truncate(1);
        self.dispatcher.reset_session();
        tracing::debug!("conversation reset");
    }

    /// Run one user turn with non-streaming model calls.
    pub async fn submit(&mut self, input: &str) -> Result<String, AgentError> {
        self.run_turn(input, None).await
    }

    /// Run one user turn, forwarding answer text to `on_text` as it streams.
    pub async fn submit_streaming(
        &mut self,
        input: &str,
        on_text: &mut TextSink<'_>,
    ) -> Result<String, AgentError> {
        self.run_turn(input, Some(on_text)).await
    }

    /// Ask a single question without offering tools.
    ///
    /// Used for explanations where the content is already in the prompt.
    pub async fn explain(&mut self, prompt: &str) -> Result<String, AgentError> {
        let checkpoint = self.history.len();
        self.history.push(ChatMessage::user(prompt));

        let result = match self.backend.complete(&self.history, None).await {
            Ok(turn) if turn.text.trim().is_empty() => Err(AgentError::EmptyAnswer),
            Ok(turn) => Ok(turn.text),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(text) => {
                self.history.push(ChatMessage::assistant(text.clone(), Vec::new()));
                Ok(text)
            }
            Err(e) => {
                self.history.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_turn(
        &mut self,
        input: &str,
        on_text: Option<&mut TextSink<'_>>,
    ) -> Result<String, AgentError> {
        let checkpoint = self.history.len();
        self.history.push(ChatMessage::user(input));

        let result = self.tool_loop(on_text).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "turn failed, rolling back history");
            self.history.truncate(checkpoint);
        }
        result
    }

    async fn tool_loop(&mut self, mut on_text: Option<&mut TextSink<'_>>) -> Result<String, AgentError> {
        for round in 1..=MAX_TOOL_ROUNDS {
            let turn = self.call_model(on_text.as_deref_mut()).await?;

            if turn.tool_calls.is_empty() {
                tracing::debug!(round, text_len = turn.text.len(), "final answer");
                self.history
                    .push(ChatMessage::assistant(turn.text.clone(), Vec::new()));
                return Ok(turn.text);
            }

            tracing::debug!(round, calls = turn.tool_calls.len(), "executing tool calls");
            let batch = self.execute_round(turn).await?;
            self.history.extend(batch);
        }

        Err(AgentError::MaxIterationsExceeded {
            rounds: MAX_TOOL_ROUNDS,
        })
    }

    async fn call_model(
        &self,
        on_text: Option<&mut TextSink<'_>>,
    ) -> Result<AssembledTurn, InferenceError> {
        let tools = Some(self.tools.as_slice());
        match on_text {
            Some(sink) => {
                self.backend
                    .complete_streaming(&self.history, tools, sink)
                    .await
            }
            None => self.backend.complete(&self.history, tools).await,
        }
    }

    /// Run every call of one assistant turn, in order.
    ///
    /// Returns the assistant message followed by one result per call. Tool
    /// failures become `Error: ...` results; bad argument JSON ends the turn.
    async fn execute_round(&mut self, turn: AssembledTurn) -> Result<Vec<ChatMessage>, AgentError> {
        let mut batch = Vec::with_capacity(turn.tool_calls.len() + 1);
        batch.push(ChatMessage::assistant(turn.text, turn.tool_calls.clone()));

        for call in &turn.tool_calls {
            let args = decode_arguments(call)?;
            let output = match self.dispatcher.dispatch(&call.function.name, &args).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(tool = %call.function.name, error = %e, "tool failed");
                    format!("Error: {e}")
                }
            };
            batch.push(ChatMessage::tool_result(call, output));
        }

        Ok(batch)
    }
}

/// Parse a call's argument text, which must be a JSON object.
fn decode_arguments(call: &ToolCall) -> Result<Value, AgentError> {
    let raw = call.function.arguments.as_str();
    let invalid = |reason: String| AgentError::ToolArgumentError {
        tool: call.function.name.clone(),
        raw: call.function.arguments.clone(),
        reason,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(invalid("arguments must be a JSON object".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
