//! Text search through ripgrep, falling back to `grep -rn`.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;

use super::{required, ToolContext, ToolError};

/// Matches returned to the model per search; `count` still reports the total.
const MAX_RESULT_MATCHES: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GrepArgs {
    pattern: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ReferenceArgs {
    symbol: Option<String>,
    path: Option<String>,
}

/// Run a recursive search and return its `file:line:content` lines.
///
/// Exit status 1 means "no matches" for both rg and grep.
pub(crate) async fn run_search(
    pattern: &str,
    search_path: &Path,
    whole_word: bool,
) -> Result<Vec<String>, ToolError> {
    let mut command = if which::which("rg").is_ok() {
        let mut c = Command::new("rg");
        c.args(["-n", "-H", "--color", "never"]);
        c
    } else {
        let mut c = Command::new("grep");
        c.args(["-rnH", "--color=never"]);
        c
    };
    if whole_word {
        command.arg("-w");
    }
    command.arg("-e").arg(pattern).arg(search_path);

    let output = command.output().await.map_err(|e| ToolError::CommandFailed {
        command: "search".to_string(),
        reason: e.to_string(),
    })?;

    match output.status.code() {
        Some(0) => {}
        Some(1) => return Ok(Vec::new()),
        _ => {
            return Err(ToolError::CommandFailed {
                command: "search".to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .trim()
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

pub(super) async fn grep(ctx: &ToolContext, args: GrepArgs) -> Result<Value, ToolError> {
    let pattern = required(args.pattern, "pattern")?;
    let search_path = ctx.resolve(args.path.as_deref().unwrap_or(""))?;

    let matches = run_search(&pattern, &search_path, false).await?;
    let matches = matches.into_iter().map(Value::String).collect();
    Ok(with_matches(
        json!({
            "pattern": pattern,
            "path": search_path.display().to_string(),
        }),
        matches,
    ))
}

/// Whole-word occurrences of a symbol, as `{file, line, content}` records.
pub(super) async fn find_symbol_references(
    ctx: &ToolContext,
    args: ReferenceArgs,
) -> Result<Value, ToolError> {
    let symbol = required(args.symbol, "symbol")?;
    let search_path = ctx.resolve(args.path.as_deref().unwrap_or(""))?;

    let lines = run_search(&symbol, &search_path, true).await?;
    let matches: Vec<Value> = lines
        .iter()
        .filter_map(|line| parse_match_line(ctx, line))
        .collect();

    Ok(with_matches(
        json!({
            "symbol": symbol,
            "path": search_path.display().to_string(),
        }),
        matches,
    ))
}

/// Add `count` and at most [`MAX_RESULT_MATCHES`] matches to `result`.
fn with_matches(mut result: Value, mut matches: Vec<Value>) -> Value {
    let total = matches.len();
    result["count"] = json!(total);
    if total > MAX_RESULT_MATCHES {
        matches.truncate(MAX_RESULT_MATCHES);
        result["truncated"] = json!(true);
        result["note"] = json!(format!(
            "Showing the first {MAX_RESULT_MATCHES} of {total} matches; narrow the pattern or path"
        ));
    }
    result["matches"] = Value::Array(matches);
    result
}

/// Split `file:line:content`. Lines without both separators are dropped.
fn parse_match_line(ctx: &ToolContext, line: &str) -> Option<Value> {
    let mut parts = line.splitn(3, ':');
    let file = parts.next()?;
    let line_number = parts.next()?;
    let content = parts.next()?;

    Some(json!({
        "file": ctx.relative(Path::new(file)),
        "line": line_number.parse::<u64>().unwrap_or(0),
        "content": content.trim(),
    }))
}
