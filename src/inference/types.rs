//! Shared types for the inference client.
//!
//! These mirror the OpenAI Chat Completions API types as served by
//! llama-server, used for both request building and response parsing.

use serde::{Deserialize, Serialize};

// ─── Conversation Types ──────────────────────────────────────────────────────

/// A single message in the conversation.
///
/// Serialization notes for llama-server:
/// - `content` is emitted as `""` (not `null`) for assistant messages that
///   only carry tool calls; some chat templates choke on `null`.
/// - `tool_calls`, `tool_call_id` and `name` are skipped when `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(serialize_with = "serialize_content", default)]
    pub content: Option<String>,
    /// Assistant messages may contain tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Tool results reference the call they answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced a tool result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Custom serializer for `content`: emit `""` instead of `null` when `None`.
fn serialize_content<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(s) => serializer.serialize_str(s),
        None => serializer.serialize_str(""),
    }
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content.into())
    }

    /// Assistant turn; `tool_calls` is dropped when empty.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::plain(Role::Assistant, content.into());
        if !tool_calls.is_empty() {
            message.tool_calls = Some(tool_calls);
        }
        message
    }

    /// Result of executing `call`, sent back to the model.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        let mut message = Self::plain(Role::Tool, content.into());
        message.tool_call_id = Some(call.id.clone());
        message.name = Some(call.function.name.clone());
        message
    }

    fn plain(role: Role, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Message text, `""` when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One invocation request emitted by the model.
///
/// `index` is the call's position within the emitting assistant turn. It is
/// the primary correlation key while a stream is being assembled and is not
/// sent back on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip)]
    pub index: i64,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub function: FunctionCall,
}

impl ToolCall {
    /// Empty entry occupying slot `index` until a fragment fills it.
    pub fn placeholder(index: i64) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// A call is complete once both its id and its name are known.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.function.name.is_empty()
    }
}

/// Function name plus the raw JSON argument text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

// ─── Request Types ───────────────────────────────────────────────────────────

/// Tool definition advertised in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function definition within a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'a str>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Body of a non-streaming completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error object some servers embed in an otherwise well-formed body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
}

/// Error envelope of a non-2xx response, `{"error": {"message": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

/// Raw SSE chunk from the streaming endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice within a streaming chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The incremental update carried by a chunk choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

/// A slice of one tool call inside a streaming delta.
///
/// Every field is optional: providers send the id, type and name once and
/// then stream the argument text over many fragments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

// ─── Assembled Output ────────────────────────────────────────────────────────

/// Final product of one model call, streaming or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledTurn {
    pub text: String,
    /// Complete tool calls; empty unless the turn finished with `tool_calls`.
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_max_tokens_omitted_when_none() {
        let req = ChatCompletionRequest {
            model: "test",
            temperature: 0.15,
            messages: &[],
            tools: None,
            tool_choice: None,
            stream: false,
            max_tokens: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("max_tokens"), "max_tokens should be omitted when None");
        assert!(!json.contains("tool_choice"));
    }

    #[test]
    fn test_request_wire_shape() {
        let messages = vec![ChatMessage::user("hi")];
        let tools = vec![ToolDefinition::function("read_file", "Read", json!({"type": "object"}))];
        let req = ChatCompletionRequest {
            model: "qwen",
            temperature: 0.5,
            messages: &messages,
            tools: Some(&tools),
            tool_choice: Some("auto"),
            stream: true,
            max_tokens: Some(512),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "qwen");
        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 512);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "read_file");
    }

    #[test]
    fn test_assistant_with_tool_calls_serializes_empty_content() {
        let call = ToolCall {
            index: 3,
            id: "c1".into(),
            r#type: "function".into(),
            function: FunctionCall {
                name: "read_file".into(),
                arguments: "{}".into(),
            },
        };
        let mut message = ChatMessage::assistant("", vec![call]);
        message.content = None;
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["content"], "");
        assert_eq!(value["tool_calls"][0]["id"], "c1");
        assert!(value["tool_calls"][0].get("index").is_none());
        assert!(value.get("tool_call_id").is_none());
    }

    #[test]
    fn test_assistant_without_tool_calls_omits_field() {
        let value = serde_json::to_value(ChatMessage::assistant("done", Vec::new())).unwrap();
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_tool_result_carries_back_reference() {
        let call = ToolCall {
            id: "c9".into(),
            function: FunctionCall {
                name: "grep".into(),
                arguments: String::new(),
            },
            ..ToolCall::default()
        };
        let message = ChatMessage::tool_result(&call, "{}");
        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("c9"));
        assert_eq!(message.name.as_deref(), Some("grep"));
    }

    #[test]
    fn test_response_message_with_null_content() {
        let body = json!({
            "choices": [{
                "message": {"role": "assistant", "content": null, "tool_calls": [
                    {"id": "a", "type": "function", "function": {"name": "grep", "arguments": "{}"}}
                ]},
                "finish_reason": "tool_calls"
            }]
        });
        let parsed: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        let message = &parsed.choices[0].message;
        assert_eq!(message.text(), "");
        assert_eq!(message.tool_calls.as_ref().unwrap()[0].function.name, "grep");
    }

    #[test]
    fn test_fragment_tolerates_missing_fields() {
        let fragment: ToolCallFragment =
            serde_json::from_value(json!({"function": {"arguments": "{\"pa"}})).unwrap();
        assert_eq!(fragment.index, None);
        assert_eq!(fragment.function.unwrap().arguments.as_deref(), Some("{\"pa"));
    }

    #[test]
    fn test_is_complete_requires_id_and_name() {
        let mut call = ToolCall::placeholder(0);
        assert!(!call.is_complete());
        call.id = "x".into();
        assert!(!call.is_complete());
        call.function.name = "grep".into();
        assert!(call.is_complete());
    }
}
