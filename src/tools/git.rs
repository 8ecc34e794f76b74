//! Git inspection tools.

use serde_json::{json, Value};
use tokio::process::Command;

use super::{PathArgs, ToolContext, ToolError};

/// Files grouped by porcelain status.
#[derive(Debug, Default, PartialEq, Eq)]
struct StatusGroups {
    modified: Vec<String>,
    added: Vec<String>,
    deleted: Vec<String>,
    untracked: Vec<String>,
}

/// Group `git status --porcelain` output.
///
/// A file can land in more than one group, e.g. `AM` is added and modified.
fn parse_porcelain(output: &str) -> StatusGroups {
    let mut groups = StatusGroups::default();
    for line in output.lines() {
        let (Some(status), Some(rest)) = (line.get(..2), line.get(2..)) else {
            continue;
        };
        let file = rest.trim();
        if file.is_empty() {
            continue;
        }

        if status.starts_with('?') {
            groups.untracked.push(file.to_string());
            continue;
        }
        let upper = status.to_ascii_uppercase();
        if upper.contains('M') {
            groups.modified.push(file.to_string());
        }
        if upper.contains('A') {
            groups.added.push(file.to_string());
        }
        if upper.contains('D') {
            groups.deleted.push(file.to_string());
        }
    }
    groups
}

fn ensure_repository(ctx: &ToolContext) -> Result<(), ToolError> {
    if ctx.root().join(".git").exists() {
        Ok(())
    } else {
        Err(ToolError::NotGitRepository)
    }
}

async fn git(ctx: &ToolContext, args: &[&str]) -> Result<String, ToolError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(ctx.root())
        .args(args)
        .output()
        .await
        .map_err(|e| ToolError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ToolError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub(super) async fn git_status(ctx: &ToolContext) -> Result<Value, ToolError> {
    ensure_repository(ctx)?;
    let output = git(ctx, &["status", "--porcelain"]).await?;
    let groups = parse_porcelain(&output);

    let total =
        groups.modified.len() + groups.added.len() + groups.deleted.len() + groups.untracked.len();
    Ok(json!({
        "modified": groups.modified,
        "added": groups.added,
        "deleted": groups.deleted,
        "untracked": groups.untracked,
        "total": total,
    }))
}

pub(super) async fn git_diff(ctx: &ToolContext, args: PathArgs) -> Result<Value, ToolError> {
    ensure_repository(ctx)?;
    let path = args.path.unwrap_or_default();

    let output = if path.is_empty() {
        git(ctx, &["diff"]).await?
    } else {
        let full = ctx.resolve(&path)?;
        let relative = ctx.relative(&full);
        git(ctx, &["diff", "--", &relative]).await?
    };

    let diff = output.trim();
    Ok(json!({
        "path": path,
        "diff": if diff.is_empty() { "No changes" } else { diff },
    }))
}
