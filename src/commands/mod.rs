//! User-facing commands: the interactive session and the one-shot
//! subcommands, plus the prompt text and terminal helpers they share.

pub mod oneshot;
pub mod render;
pub mod session;

use std::io::Write;

use crossterm::style::Stylize;

// ─── Prompts ────────────────────────────────────────────────────────────────

/// System prompt sent at the start of every conversation.
pub const SYSTEM_PROMPT: &str = "You are AXON, a local code assistant running next to the user's codebase.\n\
You specialize in PHP (Laravel), Go, JavaScript/TypeScript, shell, Docker, and Linux tooling.\n\
You have access to tools that let you read files, list directories, search code, and modify files.\n\
When you need to examine code, use the available tools instead of asking the user.\n\
IMPORTANT: All write operations (write_file, create_file, update_file, string_replace, create_directory, delete_file, delete_directory, move_file, copy_file, execute) require interactive user confirmation. The user will be prompted before any file, directory or shell operation occurs.\n\
You always respond with high-quality, concise code examples and short, focused explanations.\n\
Prefer code blocks with proper language identifiers (```php, ```go, ```ts, etc.).\n\
When given code from files, base your reasoning ONLY on this code and the described context. If you are missing information, use tools to read files before guessing.\n\
When the question is about modifying code, describe the changes and show the final version or a clear patch-style diff.";

/// Parse a `start:end` line range.
pub(crate) fn parse_line_range(range: &str) -> Option<(i64, i64)> {
    let (start, end) = range.split_once(':')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

/// `File: <path>` followed by the content in a fenced block.
pub(crate) fn fenced_file(path: &str, note: &str, lang: &str, content: &str) -> String {
    format!("File: {path}{note}\n```{lang}\n{content}\n```")
}

/// Request to explain a piece of code.
///
/// `notes` is appended to the first line, e.g. a truncation or range note.
pub(crate) fn explain_prompt(path: &str, notes: &str, lang: &str, content: &str) -> String {
    format!(
        "Explain the following code, focusing on what it does and potential issues.{notes}\n\n{}",
        fenced_file(path, "", lang, content)
    )
}

// ─── Terminal output ────────────────────────────────────────────────────────

pub(crate) fn print_assistant_header() {
    println!("\n{}", "AXON:".magenta().bold());
}

pub(crate) fn print_thinking() {
    println!("\n{}\n", "AXON is thinking...".yellow());
}

pub(crate) fn print_error(label: &str, message: impl std::fmt::Display) {
    println!("\n{} {message}", format!("{label}:").red().bold());
}

pub(crate) fn flush_stdout() {
    let _ = std::io::stdout().flush();
}
