//! Shared types for the agent core.
//!
//! Confirmation request/response types used by the tool executor and the
//! terminal prompt, plus the shared stdin handle.

use std::io::BufRead;
use std::sync::{Arc, Mutex};

use serde::Serialize;

// ─── Confirmation ───────────────────────────────────────────────────────────

/// What the user is asked to approve before a mutating tool runs.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationRequest {
    /// The tool being called.
    pub tool_name: String,
    /// Short title, e.g. "Delete file".
    pub action: String,
    /// Details and risk notes, one per line.
    pub description: String,
}

/// The user's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResponse {
    /// Allow this call only.
    Confirmed,
    /// Allow this tool for the rest of the session.
    ConfirmedForSession,
    Rejected,
}

impl ConfirmationResponse {
    /// Interpret a line typed at the prompt.
    ///
    /// Empty input, `y` and `yes` confirm once; `a` and `always` confirm for
    /// the session; anything else declines. Case and surrounding whitespace
    /// are ignored.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => ConfirmationResponse::Confirmed,
            "a" | "always" => ConfirmationResponse::ConfirmedForSession,
            _ => ConfirmationResponse::Rejected,
        }
    }

    pub fn is_confirmed(self) -> bool {
        !matches!(self, ConfirmationResponse::Rejected)
    }
}

// ─── Input ──────────────────────────────────────────────────────────────────

/// Line-oriented user input shared by the REPL and the confirmation prompt.
///
/// Both read from the same buffered stdin so that buffered-but-unread input
/// is never lost between them.
pub type SharedInput = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Shared handle over the process's stdin.
pub fn stdin_input() -> SharedInput {
    shared_input(std::io::BufReader::new(std::io::stdin()))
}

pub fn shared_input(reader: impl BufRead + Send + 'static) -> SharedInput {
    Arc::new(Mutex::new(Box::new(reader)))
}

/// Read one line, without its line ending. `None` at end of input.
pub fn read_line(input: &SharedInput) -> std::io::Result<Option<String>> {
    let mut guard = input
        .lock()
        .map_err(|_| std::io::Error::other("input lock poisoned"))?;
    let mut line = String::new();
    if guard.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
