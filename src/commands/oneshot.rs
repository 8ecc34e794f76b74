//! One-shot subcommands: `ask`, `explain` and `search`.
//!
//! Each makes at most one model call, without tools, and returns the text to
//! print. Nothing here keeps conversation state.

use std::path::Path;

use anyhow::{bail, Context};

use crate::event_log::truncate_utf8;
use crate::inference::{ChatBackend, ChatMessage};
use crate::project::paths::{file_extension, language_for_extension, read_file, read_file_range};
use crate::project::resolve_path;
use crate::tools::search::run_search;

use super::{explain_prompt, fenced_file, parse_line_range, SYSTEM_PROMPT};

/// Search output sent to the model is capped at this many bytes.
const MAX_ANALYSIS_BYTES: usize = 5000;

const TRUNCATED_FILE_NOTE: &str = " (Note: File was truncated to first 200KB)";

/// System prompt plus one user message, sent without tools.
async fn ask_model(backend: &dyn ChatBackend, user: String) -> anyhow::Result<String> {
    let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)];
    let turn = backend
        .complete(&messages, None)
        .await
        .context("LLM request failed")?;
    if turn.text.is_empty() {
        bail!("empty response from LLM");
    }
    Ok(turn.text)
}

/// `axon ask <question> [--file <path>]`
pub async fn ask(
    backend: &dyn ChatBackend,
    root: &Path,
    question: &str,
    file: Option<&str>,
) -> anyhow::Result<String> {
    let user = match file {
        Some(path) => {
            let file = read_file(root, path).context("failed to read file")?;
            let note = if file.truncated {
                format!("{TRUNCATED_FILE_NOTE}\n")
            } else {
                String::new()
            };
            let lang = language_for_extension(&file_extension(path));
            format!("{question}\n\n{}", fenced_file(path, &note, lang, &file.content))
        }
        None => question.to_string(),
    };
    tracing::debug!(root = %root.display(), "sending ask request");
    ask_model(backend, user).await
}

/// `axon explain <path> [start:end]`
pub async fn explain(
    backend: &dyn ChatBackend,
    root: &Path,
    path: &str,
    range: Option<&str>,
) -> anyhow::Result<String> {
    let (content, notes) = match range {
        Some(range) => {
            let Some((start, end)) = parse_line_range(range) else {
                bail!("invalid range format: {range} (expected start:end)");
            };
            let content =
                read_file_range(root, path, start, end).context("failed to read file range")?;
            (content, format!(" (Lines {range})"))
        }
        None => {
            let file = read_file(root, path).context("failed to read file")?;
            let note = if file.truncated { TRUNCATED_FILE_NOTE } else { "" };
            (file.content, note.to_string())
        }
    };

    let lang = language_for_extension(&file_extension(path));
    ask_model(backend, explain_prompt(path, &notes, lang, &content)).await
}

/// Raw search output, one `file:line:text` per line.
pub async fn search_matches(root: &Path, pattern: &str, path: Option<&str>) -> anyhow::Result<String> {
    let search_path = match path {
        Some(path) if !path.is_empty() => resolve_path(root, path).context("invalid search path")?,
        _ => root.to_path_buf(),
    };
    let lines = run_search(pattern, &search_path, false)
        .await
        .context("search command failed")?;
    Ok(lines.join("\n"))
}

/// Prompt asking the model to interpret search results.
fn analysis_prompt(pattern: &str, output: &str) -> String {
    let shown = if output.len() > MAX_ANALYSIS_BYTES {
        format!("{}\n... (truncated)", truncate_utf8(output, MAX_ANALYSIS_BYTES))
    } else {
        output.to_string()
    };
    format!(
        "Analyze the following search results for pattern '{pattern}':\n\n```\n{shown}\n```\n\n\
         Questions:\n1. Where is the main place to modify this behavior?\n\
         2. Which files are important for '{pattern}'?"
    )
}

/// `axon search <pattern> [path] [--explain]`
///
/// Prints matches to stdout as they are found, then the analysis if asked.
pub async fn search(
    backend: &dyn ChatBackend,
    root: &Path,
    pattern: &str,
    path: Option<&str>,
    explain: bool,
) -> anyhow::Result<()> {
    let output = search_matches(root, pattern, path).await?;
    if output.is_empty() {
        eprintln!("No matches found for pattern: {pattern}");
        return Ok(());
    }
    println!("{output}");

    if explain {
        eprintln!("\n--- LLM Analysis ---");
        let analysis = ask_model(backend, analysis_prompt(pattern, &output))
            .await
            .context("LLM analysis failed")?;
        println!("{analysis}");
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
