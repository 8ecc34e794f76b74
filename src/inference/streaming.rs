//! SSE streaming response assembler for OpenAI-compatible chat completions.
//!
//! Three layers, each usable on its own:
//! - [`sse_payloads`] splits a byte stream into `data:` payloads.
//! - [`merge_tool_call_fragment`] is the pure reducer that folds one tool call
//!   fragment into the in-progress list.
//! - [`StreamState`] applies parsed chunks, and [`assemble`] drives it over a
//!   payload stream while forwarding text deltas to the caller.

use futures::stream::{self, Stream, StreamExt};

use super::errors::InferenceError;
use super::types::{AssembledTurn, ChatCompletionChunk, ToolCall, ToolCallFragment};
use crate::event_log::{EventLog, LogEvent};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Payload that terminates a stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Finish reason announcing that the turn carries tool calls.
pub const FINISH_TOOL_CALLS: &str = "tool_calls";

/// Highest slot a fragment may claim by index before it is appended instead.
///
/// Keeps a corrupt index from allocating a huge placeholder list.
const MAX_TOOL_CALL_SLOTS: usize = 128;

/// Callback receiving each visible text delta as it arrives.
pub type TextSink<'a> = dyn FnMut(&str) -> std::io::Result<()> + Send + 'a;

// ─── SSE line reader ─────────────────────────────────────────────────────────

/// Split a raw HTTP body into SSE `data:` payloads.
///
/// Bytes are buffered only until the next `\n`. Non-data lines (comments,
/// `event:` lines, blank separators) are dropped. A transport error is
/// forwarded once and ends the stream.
pub fn sse_payloads<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    stream::unfold(
        (bytes, Vec::<u8>::new(), false),
        |(mut bytes, mut buffer, mut exhausted)| async move {
            loop {
                if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if let Some(payload) = data_payload(&line) {
                        return Some((Ok(payload), (bytes, buffer, exhausted)));
                    }
                    continue;
                }

                if exhausted {
                    // Flush a final line that had no trailing newline.
                    let line = std::mem::take(&mut buffer);
                    return data_payload(&line).map(|p| (Ok(p), (bytes, buffer, exhausted)));
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        buffer.clear();
                        return Some((Err(e), (bytes, buffer, true)));
                    }
                    None => exhausted = true,
                }
            }
        },
    )
}

/// Extract the payload of a `data:` line, if it is one and it is non-blank.
fn data_payload(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end_matches(&['\n', '\r'][..]);
    let payload = text.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.trim().is_empty() {
        return None;
    }
    Some(payload.to_string())
}

// ─── Tool call reducer ───────────────────────────────────────────────────────

/// Fold one streamed fragment into the in-progress tool call list.
///
/// Target selection, first match wins:
/// 1. the entry at position `index`, if its own `index` agrees;
/// 2. the entry whose `id` equals the fragment's non-empty `id`;
/// 3. any entry carrying the same `index` (lists shift once incomplete
///    entries are filtered out);
/// 4. a new entry: slot `index`, padded with placeholders, or the end of the
///    list when the index is negative or that slot is already taken.
///
/// `id`, `type` and `name` are copied only into empty fields. `arguments` is
/// always appended, so replaying a fragment duplicates its argument text.
/// A fragment without an index is treated as index 0.
pub fn merge_tool_call_fragment(
    mut calls: Vec<ToolCall>,
    fragment: &ToolCallFragment,
) -> Vec<ToolCall> {
    let index = fragment.index.unwrap_or(0);
    let id = fragment.id.as_deref().unwrap_or("");

    let target = position_by_index(&calls, index)
        .or_else(|| position_by_id(&calls, id))
        .or_else(|| calls.iter().position(|c| index >= 0 && c.index == index));

    let slot = match target {
        Some(pos) => pos,
        None => open_slot(&mut calls, index),
    };
    absorb(&mut calls[slot], fragment);
    calls
}

fn position_by_index(calls: &[ToolCall], index: i64) -> Option<usize> {
    let pos = usize::try_from(index).ok()?;
    calls.get(pos).filter(|c| c.index == index).map(|_| pos)
}

fn position_by_id(calls: &[ToolCall], id: &str) -> Option<usize> {
    if id.is_empty() {
        return None;
    }
    calls.iter().position(|c| c.id == id)
}

fn open_slot(calls: &mut Vec<ToolCall>, index: i64) -> usize {
    let len = calls.len();
    match usize::try_from(index) {
        Ok(slot) if slot >= len && slot < MAX_TOOL_CALL_SLOTS => {
            while calls.len() <= slot {
                let pos = calls.len() as i64;
                calls.push(ToolCall::placeholder(pos));
            }
            slot
        }
        Ok(_) => {
            calls.push(ToolCall::placeholder(index));
            len
        }
        Err(_) => {
            calls.push(ToolCall::placeholder(len as i64));
            len
        }
    }
}

fn absorb(target: &mut ToolCall, fragment: &ToolCallFragment) {
    fill_if_empty(&mut target.id, fragment.id.as_deref());
    fill_if_empty(&mut target.r#type, fragment.r#type.as_deref());
    if let Some(function) = &fragment.function {
        fill_if_empty(&mut target.function.name, function.name.as_deref());
        if let Some(arguments) = &function.arguments {
            target.function.arguments.push_str(arguments);
        }
    }
}

fn fill_if_empty(field: &mut String, incoming: Option<&str>) {
    if let Some(value) = incoming.filter(|v| !v.is_empty()) {
        if field.is_empty() {
            field.push_str(value);
        }
    }
}

/// Drop entries missing an id or a name, logging each one.
fn retain_complete(calls: &mut Vec<ToolCall>, log: &dyn EventLog) {
    calls.retain(|call| {
        if call.is_complete() {
            return true;
        }
        log.record(LogEvent::DiscardedToolCall {
            index: call.index,
            id: &call.id,
            name: &call.function.name,
        });
        false
    });
}

// ─── Stream State ────────────────────────────────────────────────────────────

/// Transient state for one streamed model call.
#[derive(Debug, Default)]
pub struct StreamState {
    text: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<String>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse and apply one `data:` payload.
    ///
    /// Malformed JSON is logged and ignored. Returns the visible text delta
    /// carried by the payload, if any.
    pub fn apply_payload(&mut self, payload: &str, log: &dyn EventLog) -> Option<String> {
        match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => self.apply_chunk(chunk, log),
            Err(e) => {
                log.record(LogEvent::MalformedChunk {
                    payload,
                    reason: &e.to_string(),
                });
                None
            }
        }
    }

    /// Apply the first choice of a parsed chunk.
    pub fn apply_chunk(&mut self, chunk: ChatCompletionChunk, log: &dyn EventLog) -> Option<String> {
        let choice = chunk.choices.into_iter().next()?;

        if let Some(fragments) = &choice.delta.tool_calls {
            for fragment in fragments {
                let calls = std::mem::take(&mut self.tool_calls);
                self.tool_calls = merge_tool_call_fragment(calls, fragment);
            }
        }

        if let Some(reason) = choice.finish_reason.filter(|r| !r.is_empty()) {
            if reason == FINISH_TOOL_CALLS {
                retain_complete(&mut self.tool_calls, log);
            }
            self.finish_reason = Some(reason);
        }

        let delta = choice.delta.content.filter(|c| !c.is_empty())?;
        self.text.push_str(&delta);
        Some(delta)
    }

    /// Close the round.
    ///
    /// Tool calls survive only when the last finish reason was `tool_calls`,
    /// and then only the complete ones.
    pub fn finish(mut self, log: &dyn EventLog) -> AssembledTurn {
        let tool_calls = if self.finish_reason.as_deref() == Some(FINISH_TOOL_CALLS) {
            retain_complete(&mut self.tool_calls, log);
            self.tool_calls
        } else {
            Vec::new()
        };

        log.record(LogEvent::StreamComplete {
            finish_reason: self.finish_reason.as_deref(),
            text_len: self.text.len(),
            tool_calls: tool_calls.len(),
        });

        AssembledTurn {
            text: self.text,
            tool_calls,
            finish_reason: self.finish_reason,
        }
    }
}

// ─── Assembler ───────────────────────────────────────────────────────────────

/// Drive a payload stream to completion.
///
/// Each text delta is passed to `on_text` as it arrives; a callback error
/// aborts the call. A transport error aborts with the text received so far.
pub async fn assemble<S, E>(
    payloads: S,
    log: &dyn EventLog,
    on_text: &mut TextSink<'_>,
) -> Result<AssembledTurn, InferenceError>
where
    S: Stream<Item = Result<String, E>>,
    E: std::fmt::Display,
{
    futures::pin_mut!(payloads);
    let mut state = StreamState::new();

    while let Some(item) = payloads.next().await {
        let payload = match item {
            Ok(payload) => payload,
            Err(e) => {
                return Err(InferenceError::StreamInterrupted {
                    reason: e.to_string(),
                    partial_text: state.text,
                });
            }
        };

        if payload.trim() == DONE_MARKER {
            break;
        }

        if let Some(delta) = state.apply_payload(&payload, log) {
            on_text(&delta).map_err(|e| InferenceError::CallbackFailed {
                reason: e.to_string(),
            })?;
        }
    }

    Ok(state.finish(log))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::tests::RecordingLog;
    use crate::event_log::NoopLog;
    use crate::inference::types::FunctionFragment;
    use serde_json::json;

    fn fragment(index: Option<i64>, id: &str, name: &str, args: &str) -> ToolCallFragment {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ToolCallFragment {
            index,
            id: non_empty(id),
            r#type: non_empty(id).map(|_| "function".to_string()),
            function: Some(FunctionFragment {
                name: non_empty(name),
                arguments: non_empty(args),
            }),
        }
    }

    fn fold(fragments: &[ToolCallFragment]) -> Vec<ToolCall> {
        fragments
            .iter()
            .fold(Vec::new(), |calls, f| merge_tool_call_fragment(calls, f))
    }

    fn payloads(values: Vec<serde_json::Value>) -> Vec<Result<String, std::io::Error>> {
        values.into_iter().map(|v| Ok(v.to_string())).collect()
    }

    async fn run(items: Vec<Result<String, std::io::Error>>) -> (Result<AssembledTurn, InferenceError>, Vec<String>) {
        let mut seen = Vec::new();
        let mut sink = |delta: &str| -> std::io::Result<()> {
            seen.push(delta.to_string());
            Ok(())
        };
        let result = assemble(stream::iter(items), &NoopLog, &mut sink).await;
        (result, seen)
    }

    // ── reducer ─────────────────────────────────────────────────────────

    #[test]
    fn test_merge_new_call_at_index() {
        let calls = fold(&[fragment(Some(0), "c1", "read_file", "{")]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].r#type, "function");
        assert_eq!(calls[0].function.name, "read_file");
        assert_eq!(calls[0].function.arguments, "{");
    }

    #[test]
    fn test_merge_pads_with_placeholders() {
        let calls = fold(&[fragment(Some(2), "c3", "grep", "")]);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].index, 0);
        assert_eq!(calls[1].index, 1);
        assert!(!calls[0].is_complete());
        assert_eq!(calls[2].id, "c3");
        assert_eq!(calls[2].index, 2);
    }

    #[test]
    fn test_merge_negative_index_takes_next_slot() {
        let calls = fold(&[
            fragment(Some(-1), "a", "read_file", ""),
            fragment(Some(-1), "b", "grep", ""),
        ]);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[1].id, "b");
        assert_eq!(calls[1].index, 1);
    }

    #[test]
    fn test_merge_missing_index_is_zero() {
        let calls = fold(&[
            fragment(None, "c1", "read_file", "{\"path\""),
            fragment(None, "", "", ":\"x\"}"),
        ]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.arguments, "{\"path\":\"x\"}");
    }

    #[test]
    fn test_merge_does_not_overwrite_identity() {
        let calls = fold(&[
            fragment(Some(0), "c1", "read_file", ""),
            fragment(Some(0), "other", "grep", ""),
        ]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].function.name, "read_file");
    }

    #[test]
    fn test_merge_replay_appends_arguments() {
        // Appending is intentional: a replayed fragment duplicates its text.
        let f = fragment(Some(0), "c1", "read_file", "{\"a\":1}");
        let calls = fold(&[f.clone(), f]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].function.arguments, "{\"a\":1}{\"a\":1}");
    }

    #[test]
    fn test_merge_index_and_id_addressing_converge() {
        let calls = fold(&[
            fragment(Some(0), "c1", "read_file", ""),
            fragment(Some(7), "c1", "", "{\"path\""),
            fragment(Some(0), "", "", ":\"a.go\""),
            fragment(Some(9), "c1", "", "}"),
        ]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.arguments, "{\"path\":\"a.go\"}");
    }

    #[test]
    fn test_merge_index_match_beats_id_match() {
        let mut calls = fold(&[
            fragment(Some(0), "c1", "read_file", ""),
            fragment(Some(1), "c2", "grep", ""),
        ]);
        calls = merge_tool_call_fragment(calls, &fragment(Some(0), "c2", "", "X"));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.arguments, "X");
        assert_eq!(calls[1].function.arguments, "");
    }

    #[test]
    fn test_merge_finds_shifted_entry_by_index_field() {
        // After filtering, the call with index 1 sits at position 0.
        let mut calls = vec![ToolCall {
            index: 1,
            id: "c2".into(),
            ..ToolCall::default()
        }];
        calls[0].function.name = "grep".into();
        let calls = merge_tool_call_fragment(calls, &fragment(Some(1), "", "", "{}"));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.arguments, "{}");
    }

    #[test]
    fn test_merge_occupied_slot_appends_instead_of_overwriting() {
        let mut existing = ToolCall {
            index: 1,
            id: "c2".into(),
            ..ToolCall::default()
        };
        existing.function.name = "grep".into();
        let calls = merge_tool_call_fragment(vec![existing], &fragment(Some(0), "c1", "read_file", ""));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "c2");
        assert_eq!(calls[1].id, "c1");
        assert_eq!(calls[1].index, 0);
    }

    #[test]
    fn test_merge_huge_index_does_not_allocate_slots() {
        let calls = fold(&[fragment(Some(1_000_000), "c1", "grep", "")]);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].index, 1_000_000);
    }

    #[test]
    fn test_arguments_round_trip_across_chunk_boundaries() {
        let args = r#"{"path":"src/main.rs","start_line":"10","end_line":20}"#;
        for size in 1..=args.len() {
            let mut fragments = vec![fragment(Some(0), "c1", "read_file_lines", "")];
            let bytes = args.as_bytes();
            for piece in bytes.chunks(size) {
                let piece = std::str::from_utf8(piece).unwrap();
                fragments.push(fragment(Some(0), "", "", piece));
            }
            let calls = fold(&fragments);
            assert_eq!(calls.len(), 1, "chunk size {size}");
            assert_eq!(calls[0].function.arguments, args, "chunk size {size}");
        }
    }

    // ── SSE reader ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_sse_payloads_split_across_reads() {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"a\"".to_vec()),
            Ok(b":1}\r\n\ndata:{\"b\":2}\n: keep-alive\n".to_vec()),
            Ok(b"event: ping\ndata: [DONE]".to_vec()),
        ];
        let out: Vec<String> = sse_payloads(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}", "[DONE]"]);
    }

    #[tokio::test]
    async fn test_sse_payloads_multibyte_split() {
        let line = "data: {\"content\":\"═\"}\n".as_bytes().to_vec();
        let (a, b) = line.split_at(19);
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![Ok(a.to_vec()), Ok(b.to_vec())];
        let out: Vec<String> = sse_payloads(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(out, vec!["{\"content\":\"═\"}"]);
    }

    #[tokio::test]
    async fn test_sse_payloads_forwards_error_then_ends() {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: 1\n".to_vec()),
            Err(std::io::Error::other("reset")),
            Ok(b"data: 2\n".to_vec()),
        ];
        let out: Vec<Result<String, std::io::Error>> =
            sse_payloads(stream::iter(chunks)).collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }

    // ── assembler scenarios ────────────────────────────────────────────

    #[tokio::test]
    async fn test_assemble_plain_text() {
        let items = payloads(vec![
            json!({"choices": [{"delta": {"content": "Hel"}}]}),
            json!({"choices": [{"delta": {"content": "lo"}}]}),
            json!({"choices": [{"delta": {}, "finish_reason": "stop"}]}),
        ]);
        let (result, seen) = run(items).await;
        let turn = result.unwrap();
        assert_eq!(turn.text, "Hello");
        assert!(turn.tool_calls.is_empty());
        assert_eq!(turn.finish_reason.as_deref(), Some("stop"));
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_assemble_single_tool_call() {
        let items = payloads(vec![
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c1", "type": "function", "function": {"name": "read_file", "arguments": "{\"path\""}}
            ]}}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": ":\"a.go\"}"}}
            ]}}]}),
            json!({"choices": [{"delta": {}, "finish_reason": "tool_calls"}]}),
        ]);
        let (result, seen) = run(items).await;
        let turn = result.unwrap();
        assert!(seen.is_empty());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].id, "c1");
        assert_eq!(turn.tool_calls[0].function.name, "read_file");
        assert_eq!(turn.tool_calls[0].function.arguments, "{\"path\":\"a.go\"}");
    }

    #[tokio::test]
    async fn test_assemble_nameless_call_is_filtered() {
        let log = RecordingLog::default();
        let items = vec![
            json!({"choices": [{"delta": {"content": "Let me look."}}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c1", "function": {"arguments": "{}"}}
            ]}}]}),
            json!({"choices": [{"delta": {}, "finish_reason": "tool_calls"}]}),
        ];
        let mut sink = |_: &str| -> std::io::Result<()> { Ok(()) };
        let stream = stream::iter(items.into_iter().map(|v| Ok::<_, std::io::Error>(v.to_string())));
        let turn = assemble(stream, &log, &mut sink).await.unwrap();
        assert!(turn.tool_calls.is_empty());
        assert_eq!(turn.text, "Let me look.");
        assert!(log.entries().contains(&"discarded 0".to_string()));
    }

    #[tokio::test]
    async fn test_assemble_discards_calls_without_tool_calls_finish() {
        let items = payloads(vec![
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c1", "function": {"name": "grep", "arguments": "{}"}}
            ]}}]}),
            json!({"choices": [{"delta": {}, "finish_reason": "stop"}]}),
        ]);
        let (result, _) = run(items).await;
        assert!(result.unwrap().tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_assemble_keeps_last_non_empty_finish_reason() {
        let items = payloads(vec![
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c1", "function": {"name": "grep", "arguments": "{}"}}
            ]}, "finish_reason": "tool_calls"}]}),
            json!({"choices": [{"delta": {}, "finish_reason": ""}]}),
            json!({"choices": [{"delta": {}, "finish_reason": null}]}),
        ]);
        let (result, _) = run(items).await;
        let turn = result.unwrap();
        assert_eq!(turn.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(turn.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn test_assemble_trailing_deltas_after_finish() {
        let items = payloads(vec![
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c1", "function": {"name": "grep", "arguments": "{"}},
                {"index": 1, "id": "c2"}
            ]}, "finish_reason": "tool_calls"}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "}"}}
            ]}}]}),
        ]);
        let (result, _) = run(items).await;
        let turn = result.unwrap();
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].function.arguments, "{}");
    }

    #[tokio::test]
    async fn test_assemble_skips_malformed_and_empty_choices() {
        let log = RecordingLog::default();
        let items = vec![
            "{not json".to_string(),
            json!({"choices": []}).to_string(),
            json!({"choices": [{"delta": {"content": "ok"}}]}).to_string(),
        ];
        let mut sink = |_: &str| -> std::io::Result<()> { Ok(()) };
        let stream = stream::iter(items.into_iter().map(Ok::<_, std::io::Error>));
        let turn = assemble(stream, &log, &mut sink).await.unwrap();
        assert_eq!(turn.text, "ok");
        assert!(log.entries().contains(&"malformed".to_string()));
    }

    #[tokio::test]
    async fn test_assemble_stops_at_done() {
        let mut items = payloads(vec![json!({"choices": [{"delta": {"content": "a"}}]})]);
        items.push(Ok("[DONE]".to_string()));
        items.extend(payloads(vec![json!({"choices": [{"delta": {"content": "b"}}]})]));
        let (result, seen) = run(items).await;
        assert_eq!(result.unwrap().text, "a");
        assert_eq!(seen, vec!["a"]);
    }

    #[tokio::test]
    async fn test_assemble_callback_failure_aborts() {
        let items = payloads(vec![
            json!({"choices": [{"delta": {"content": "a"}}]}),
            json!({"choices": [{"delta": {"content": "b"}}]}),
        ]);
        let mut calls = 0;
        let mut sink = |_: &str| -> std::io::Result<()> {
            calls += 1;
            Err(std::io::Error::other("broken pipe"))
        };
        let err = assemble(stream::iter(items), &NoopLog, &mut sink).await.unwrap_err();
        assert!(matches!(err, InferenceError::CallbackFailed { .. }));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_assemble_transport_error_keeps_partial_text() {
        let mut items = payloads(vec![json!({"choices": [{"delta": {"content": "Hel"}}]})]);
        items.push(Err(std::io::Error::other("connection reset")));
        let (result, _) = run(items).await;
        let err = result.unwrap_err();
        assert_eq!(err.partial_text(), Some("Hel"));
    }
}
