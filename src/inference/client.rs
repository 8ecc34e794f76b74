//! OpenAI-compatible inference client.
//!
//! Sends chat completion requests to the local llama-server and returns the
//! assembled assistant turn, either from a single JSON body or from an SSE
//! stream whose text deltas are forwarded to the caller as they arrive.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use uuid::Uuid;

use super::errors::InferenceError;
use super::streaming::{assemble, sse_payloads, TextSink};
use super::types::{
    AssembledTurn, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ErrorEnvelope,
    ResponseChoice, ToolDefinition,
};
use crate::event_log::{LogEvent, SharedLog};
use crate::project::config::LlmConfig;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout for non-streaming calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Total request timeout for streaming calls.
///
/// Covers the whole body. Large contexts on CPU-only machines can take
/// minutes before the first token.
const STREAM_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

// ─── ChatBackend ─────────────────────────────────────────────────────────────

/// A model endpoint that can complete a conversation.
///
/// `tools`, when present, is advertised with `tool_choice = "auto"`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<AssembledTurn, InferenceError>;

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        on_text: &mut TextSink<'_>,
    ) -> Result<AssembledTurn, InferenceError>;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the llama-server chat completion endpoint.
pub struct InferenceClient {
    /// HTTP client for non-streaming requests.
    http: HttpClient,
    /// HTTP client for streaming requests.
    http_stream: HttpClient,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    log: SharedLog,
}

impl InferenceClient {
    /// Create a client from the `llm` config section.
    ///
    /// Does NOT check connectivity; that happens on the first request.
    pub fn from_config(config: &LlmConfig, log: SharedLog) -> Result<Self, InferenceError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Transport {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let http_stream = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(STREAM_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Transport {
                endpoint: base_url.clone(),
                reason: format!("failed to build streaming HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            http_stream,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            log,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}{COMPLETIONS_PATH}", self.base_url)
    }

    /// Serialize the request body and mirror it to the event log.
    fn encode_request(
        &self,
        url: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> Result<String, InferenceError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
            tools,
            tool_choice: tools.map(|_| "auto"),
            stream,
            max_tokens: self.max_tokens,
        };
        let body = serde_json::to_string(&request).map_err(|e| InferenceError::Decode {
            reason: format!("failed to encode request: {e}"),
        })?;

        tracing::debug!(
            url,
            model = %self.model,
            message_count = messages.len(),
            tool_count = tools.map(|t| t.len()).unwrap_or(0),
            stream,
            "sending chat completion request"
        );
        self.log.record(LogEvent::Request {
            method: "POST",
            url,
            body: &body,
        });
        Ok(body)
    }

    fn map_send_error(&self, e: reqwest::Error, url: &str, deadline: Duration) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                duration_secs: deadline.as_secs(),
            }
        } else {
            InferenceError::Transport {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    /// Convert the first choice of a non-streaming body into a turn.
    ///
    /// Calls without an id get a generated one; calls without a name cannot
    /// be dispatched and are dropped.
    fn turn_from_choice(&self, choice: ResponseChoice) -> AssembledTurn {
        let text = choice.message.text().to_string();
        let mut tool_calls = choice.message.tool_calls.unwrap_or_default();

        for (position, call) in tool_calls.iter_mut().enumerate() {
            call.index = position as i64;
            if call.id.is_empty() {
                call.id = format!("call_{}", Uuid::new_v4());
            }
            if call.r#type.is_empty() {
                call.r#type = "function".to_string();
            }
        }
        tool_calls.retain(|call| {
            if call.is_complete() {
                return true;
            }
            self.log.record(LogEvent::DiscardedToolCall {
                index: call.index,
                id: &call.id,
                name: &call.function.name,
            });
            false
        });

        AssembledTurn {
            text,
            tool_calls,
            finish_reason: choice.finish_reason,
        }
    }
}

/// Best human-readable message from an error body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl ChatBackend for InferenceClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<AssembledTurn, InferenceError> {
        let url = self.completions_url();
        let body = self.encode_request(&url, messages, tools, false)?;

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &url, REQUEST_TIMEOUT))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e, &url, REQUEST_TIMEOUT))?;
        self.log.record(LogEvent::Response {
            status: status.as_u16(),
            body: &text,
        });

        if !status.is_success() {
            return Err(InferenceError::Protocol {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| InferenceError::Decode {
                reason: e.to_string(),
            })?;

        if let Some(error) = parsed.error.filter(|e| !e.message.is_empty()) {
            return Err(InferenceError::Protocol {
                status: status.as_u16(),
                message: error.message,
            });
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(InferenceError::EmptyResponse)?;
        Ok(self.turn_from_choice(choice))
    }

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        on_text: &mut TextSink<'_>,
    ) -> Result<AssembledTurn, InferenceError> {
        let url = self.completions_url();
        let body = self.encode_request(&url, messages, tools, true)?;

        let response = self
            .http_stream
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &url, STREAM_REQUEST_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            self.log.record(LogEvent::Response {
                status: status.as_u16(),
                body: &text,
            });
            return Err(InferenceError::Protocol {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }
        self.log.record(LogEvent::Response {
            status: status.as_u16(),
            body: "",
        });

        let payloads = sse_payloads(Box::pin(response.bytes_stream()));
        assemble(payloads, self.log.as_ref(), on_text).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
