//! Event log: the structured logging collaborator handed to the transport
//! client and the tool executor at construction time.
//!
//! Logging is fire-and-forget: implementations never return errors, and the
//! default [`NoopLog`] drops everything. [`TracingLog`] forwards events to
//! `tracing` with size-capped bodies.

use std::sync::Arc;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Maximum HTTP body bytes kept in a request/response log entry.
pub const MAX_LOGGED_BODY_BYTES: usize = 10_000;

/// Maximum tool result bytes kept in a tool-call log entry.
pub const MAX_LOGGED_RESULT_BYTES: usize = 5_000;

const TRUNCATION_MARKER: &str = "\n... (truncated)";

// ─── Events ─────────────────────────────────────────────────────────────────

/// Result of a single tool invocation, as seen by the log.
#[derive(Debug, Clone, Copy)]
pub enum ToolOutcome<'a> {
    Success(&'a str),
    Failure(&'a str),
}

/// One loggable occurrence.
#[derive(Debug, Clone, Copy)]
pub enum LogEvent<'a> {
    /// Outgoing HTTP request.
    Request {
        method: &'a str,
        url: &'a str,
        body: &'a str,
    },
    /// HTTP response (body is empty for a successful stream).
    Response { status: u16, body: &'a str },
    /// A tool was invoked by the model.
    ToolCall {
        name: &'a str,
        arguments: &'a str,
        outcome: ToolOutcome<'a>,
    },
    /// An SSE `data:` payload that was not valid JSON and was skipped.
    MalformedChunk { payload: &'a str, reason: &'a str },
    /// An incomplete tool call dropped at the end of a tool-call round.
    DiscardedToolCall {
        index: i64,
        id: &'a str,
        name: &'a str,
    },
    /// A streamed response finished.
    StreamComplete {
        finish_reason: Option<&'a str>,
        text_len: usize,
        tool_calls: usize,
    },
}

/// Sink for [`LogEvent`]s.
pub trait EventLog: Send + Sync {
    fn record(&self, event: LogEvent<'_>);
}

/// Shared handle used by every collaborator.
pub type SharedLog = Arc<dyn EventLog>;

/// Handle to the no-op log.
pub fn noop() -> SharedLog {
    Arc::new(NoopLog)
}

// ─── NoopLog ────────────────────────────────────────────────────────────────

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

impl EventLog for NoopLog {
    fn record(&self, _event: LogEvent<'_>) {}
}

// ─── TracingLog ─────────────────────────────────────────────────────────────

/// Forwards events to `tracing`.
///
/// Wire traffic and tool results are emitted at `debug`; skipped chunks and
/// discarded tool calls at `warn`. Bodies are capped on a char boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl EventLog for TracingLog {
    fn record(&self, event: LogEvent<'_>) {
        match event {
            LogEvent::Request { method, url, body } => {
                tracing::debug!(
                    method,
                    url,
                    body = %cap_for_log(body, MAX_LOGGED_BODY_BYTES),
                    ">>> request"
                );
            }
            LogEvent::Response { status, body } => {
                tracing::debug!(
                    status,
                    body = %cap_for_log(body, MAX_LOGGED_BODY_BYTES),
                    "<<< response"
                );
            }
            LogEvent::ToolCall {
                name,
                arguments,
                outcome: ToolOutcome::Success(result),
            } => {
                tracing::debug!(
                    tool = name,
                    args = arguments,
                    result = %cap_for_log(result, MAX_LOGGED_RESULT_BYTES),
                    "tool call"
                );
            }
            LogEvent::ToolCall {
                name,
                arguments,
                outcome: ToolOutcome::Failure(error),
            } => {
                tracing::debug!(tool = name, args = arguments, error, "tool call failed");
            }
            LogEvent::MalformedChunk { payload, reason } => {
                tracing::warn!(
                    payload = %cap_for_log(payload, MAX_LOGGED_BODY_BYTES),
                    reason,
                    "skipping malformed SSE payload"
                );
            }
            LogEvent::DiscardedToolCall { index, id, name } => {
                tracing::warn!(index, id, name, "skipping incomplete tool call");
            }
            LogEvent::StreamComplete {
                finish_reason,
                text_len,
                tool_calls,
            } => {
                tracing::debug!(
                    finish_reason = finish_reason.unwrap_or(""),
                    text_len,
                    tool_calls,
                    "stream complete"
                );
            }
        }
    }
}

// ─── UTF-8 Safe Truncation ──────────────────────────────────────────────────

/// Truncate a string to at most `max_bytes` bytes on a valid UTF-8 char boundary.
pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Cap `s` at `max_bytes`, appending a marker when anything was cut.
pub(crate) fn cap_for_log(s: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if s.len() <= max_bytes {
        std::borrow::Cow::Borrowed(s)
    } else {
        std::borrow::Cow::Owned(format!("{}{TRUNCATION_MARKER}", truncate_utf8(s, max_bytes)))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records a compact description of each event, for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingLog {
        pub(crate) entries: Mutex<Vec<String>>,
    }

    impl RecordingLog {
        pub(crate) fn entries(&self) -> Vec<String> {
            self.entries.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }

    impl EventLog for RecordingLog {
        fn record(&self, event: LogEvent<'_>) {
            let line = match event {
                LogEvent::Request { method, url, .. } => format!("request {method} {url}"),
                LogEvent::Response { status, .. } => format!("response {status}"),
                LogEvent::ToolCall { name, outcome, .. } => match outcome {
                    ToolOutcome::Success(_) => format!("tool {name} ok"),
                    ToolOutcome::Failure(e) => format!("tool {name} failed: {e}"),
                },
                LogEvent::MalformedChunk { .. } => "malformed".to_string(),
                LogEvent::DiscardedToolCall { index, .. } => format!("discarded {index}"),
                LogEvent::StreamComplete { tool_calls, .. } => {
                    format!("complete tool_calls={tool_calls}")
                }
            };
            if let Ok(mut entries) = self.entries.lock() {
                entries.push(line);
            }
        }
    }

    #[test]
    fn test_truncate_utf8_ascii() {
        assert_eq!(truncate_utf8("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_utf8_multibyte_boundary() {
        // '═' is 3 bytes; cutting at 4 must back off to the first char.
        assert_eq!(truncate_utf8("═══", 4), "═");
    }

    #[test]
    fn test_truncate_utf8_short_string_untouched() {
        assert_eq!(truncate_utf8("abc", 10), "abc");
    }

    #[test]
    fn test_cap_for_log_appends_marker() {
        let body = "x".repeat(MAX_LOGGED_BODY_BYTES + 10);
        let capped = cap_for_log(&body, MAX_LOGGED_BODY_BYTES);
        assert!(capped.ends_with("... (truncated)"));
        assert_eq!(capped.len(), MAX_LOGGED_BODY_BYTES + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_cap_for_log_borrows_when_small() {
        assert!(matches!(cap_for_log("ok", 10), std::borrow::Cow::Borrowed("ok")));
    }

    #[test]
    fn test_noop_log_accepts_everything() {
        let log = noop();
        log.record(LogEvent::Response { status: 200, body: "" });
    }
}
