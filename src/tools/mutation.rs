//! Mutating tools: file writes, deletes, moves, and shell commands.
//!
//! Planning validates everything that can be checked up front and builds the
//! text shown in the confirmation prompt. Nothing on disk changes until
//! [`Mutation::apply`].

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;

use super::{required, PathArgs, ToolContext, ToolError};

const OVERWRITE_WARNING: &str = "⚠️  Destination file exists and will be overwritten!";
const UNDO_WARNING: &str = "⚠️  This action cannot be undone!";

/// Longest snippet of replaced text shown in a prompt.
const PROMPT_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ContentArgs {
    path: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ReplaceArgs {
    path: Option<String>,
    old_string: Option<String>,
    new_string: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct TransferArgs {
    source: Option<String>,
    destination: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ExecuteArgs {
    command: Option<String>,
    description: Option<String>,
}

#[derive(Debug)]
enum Operation {
    Write {
        full: PathBuf,
        path: String,
        content: String,
        message: &'static str,
    },
    Replace {
        full: PathBuf,
        path: String,
        old: String,
        new: String,
    },
    CreateDirectory {
        full: PathBuf,
        path: String,
    },
    DeleteFile {
        full: PathBuf,
        path: String,
    },
    DeleteDirectory {
        full: PathBuf,
        path: String,
    },
    Move {
        from: PathBuf,
        to: PathBuf,
        source: String,
        destination: String,
    },
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: String,
        destination: String,
    },
    Execute {
        command: String,
        cwd: PathBuf,
    },
}

/// A validated, not yet applied, mutating tool call.
#[derive(Debug)]
pub struct Mutation {
    /// Short title for the prompt, e.g. "Delete file".
    pub action: String,
    /// Multi-line details and risk notes.
    pub description: String,
    operation: Operation,
}

impl Mutation {
    fn new(action: &str, description: String, operation: Operation) -> Self {
        Self {
            action: action.to_string(),
            description,
            operation,
        }
    }

    /// Perform the effect and return the tool's JSON result.
    pub async fn apply(self) -> Result<String, ToolError> {
        let result = match self.operation {
            Operation::Write {
                full,
                path,
                content,
                message,
            } => {
                create_parent(&full, &path)?;
                std::fs::write(&full, &content).map_err(|e| ToolError::io("write", &path, e))?;
                json!({
                    "path": path,
                    "success": true,
                    "bytes_written": content.len(),
                    "message": message,
                })
            }
            Operation::Replace {
                full,
                path,
                old,
                new,
            } => {
                let current =
                    std::fs::read_to_string(&full).map_err(|e| ToolError::io("read", &path, e))?;
                let replacements = current.matches(old.as_str()).count();
                if replacements == 0 {
                    return Err(not_found_in_file(&path));
                }
                std::fs::write(&full, current.replace(old.as_str(), &new))
                    .map_err(|e| ToolError::io("write", &path, e))?;
                json!({
                    "path": path,
                    "success": true,
                    "replacements": replacements,
                    "message": "String replaced successfully",
                })
            }
            Operation::CreateDirectory { full, path } => {
                std::fs::create_dir_all(&full)
                    .map_err(|e| ToolError::io("create directory", &path, e))?;
                json!({
                    "path": path,
                    "success": true,
                    "message": "Directory created successfully",
                })
            }
            Operation::DeleteFile { full, path } => {
                std::fs::remove_file(&full).map_err(|e| ToolError::io("delete file", &path, e))?;
                json!({
                    "path": path,
                    "success": true,
                    "message": "File deleted successfully",
                })
            }
            Operation::DeleteDirectory { full, path } => {
                std::fs::remove_dir_all(&full)
                    .map_err(|e| ToolError::io("delete directory", &path, e))?;
                json!({
                    "path": path,
                    "success": true,
                    "message": "Directory deleted successfully",
                })
            }
            Operation::Move {
                from,
                to,
                source,
                destination,
            } => {
                create_parent(&to, &destination)?;
                std::fs::rename(&from, &to).map_err(|e| ToolError::io("move", &source, e))?;
                json!({
                    "source": source,
                    "destination": destination,
                    "success": true,
                    "message": "File moved successfully",
                })
            }
            Operation::Copy {
                from,
                to,
                source,
                destination,
            } => {
                create_parent(&to, &destination)?;
                std::fs::copy(&from, &to).map_err(|e| ToolError::io("copy", &source, e))?;
                json!({
                    "source": source,
                    "destination": destination,
                    "success": true,
                    "message": "File copied successfully",
                })
            }
            Operation::Execute { command, cwd } => run_shell(&command, &cwd).await?,
        };
        Ok(result.to_string())
    }
}

fn create_parent(full: &std::path::Path, path: &str) -> Result<(), ToolError> {
    match full.parent() {
        Some(parent) => std::fs::create_dir_all(parent)
            .map_err(|e| ToolError::io("create parent directory for", path, e)),
        None => Ok(()),
    }
}

fn not_found_in_file(path: &str) -> ToolError {
    ToolError::InvalidArgument {
        argument: "old_string".to_string(),
        reason: format!("string not found in {path}"),
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() <= PROMPT_SNIPPET_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PROMPT_SNIPPET_CHARS).collect();
        format!("{cut}...")
    }
}

/// Content is allowed to be empty; only its absence is an error.
fn content_arg(value: Option<String>) -> Result<String, ToolError> {
    value.ok_or(ToolError::MissingArgument { argument: "content" })
}

// ─── Planning ────────────────────────────────────────────────────────────────

pub(super) fn plan_write(ctx: &ToolContext, args: ContentArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let content = content_arg(args.content)?;
    let full = ctx.resolve_writable(&path)?;
    if full.is_dir() {
        return Err(ToolError::IsDirectory { path });
    }

    let mut description = format!("File: {path}\nSize: {} bytes", content.len());
    if full.exists() {
        description.push_str("\n⚠️  File exists and will be overwritten!");
    }
    Ok(Mutation::new(
        "Write file",
        description,
        Operation::Write {
            full,
            path,
            content,
            message: "File written successfully",
        },
    ))
}

pub(super) fn plan_create(ctx: &ToolContext, args: ContentArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let content = content_arg(args.content)?;
    let full = ctx.resolve_writable(&path)?;
    if full.exists() {
        return Err(ToolError::AlreadyExists { path });
    }

    let description = format!("File: {path}\nSize: {} bytes", content.len());
    Ok(Mutation::new(
        "Create file",
        description,
        Operation::Write {
            full,
            path,
            content,
            message: "File created successfully",
        },
    ))
}

pub(super) fn plan_update(ctx: &ToolContext, args: ContentArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let content = content_arg(args.content)?;
    let full = ctx.resolve_writable(&path)?;
    let metadata = std::fs::metadata(&full).map_err(|_| ToolError::NotFound {
        what: "file",
        path: path.clone(),
    })?;
    if metadata.is_dir() {
        return Err(ToolError::IsDirectory { path });
    }

    let description = format!(
        "File: {path}\nOld size: {} bytes\nNew size: {} bytes",
        metadata.len(),
        content.len()
    );
    Ok(Mutation::new(
        "Update file",
        description,
        Operation::Write {
            full,
            path,
            content,
            message: "File updated successfully",
        },
    ))
}

pub(super) fn plan_replace(ctx: &ToolContext, args: ReplaceArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let old = required(args.old_string, "old_string")?;
    let new = args
        .new_string
        .ok_or(ToolError::MissingArgument { argument: "new_string" })?;
    let full = ctx.resolve_writable(&path)?;

    let current = std::fs::read_to_string(&full).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::NotFound {
            what: "file",
            path: path.clone(),
        },
        _ => ToolError::io("read", &path, e),
    })?;
    let occurrences = current.matches(old.as_str()).count();
    if occurrences == 0 {
        return Err(not_found_in_file(&path));
    }

    let description = format!(
        "File: {path}\nReplace: {}\nWith: {}\nOccurrences: {occurrences}",
        snippet(&old),
        snippet(&new)
    );
    Ok(Mutation::new(
        "Replace text in file",
        description,
        Operation::Replace {
            full,
            path,
            old,
            new,
        },
    ))
}

pub(super) fn plan_create_directory(ctx: &ToolContext, args: PathArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let full = ctx.resolve_writable_dir(&path)?;
    if full.exists() && !full.is_dir() {
        return Err(ToolError::AlreadyExists { path });
    }

    Ok(Mutation::new(
        "Create directory",
        format!("Directory: {path}"),
        Operation::CreateDirectory { full, path },
    ))
}

pub(super) fn plan_delete_file(ctx: &ToolContext, args: PathArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let full = ctx.resolve_writable(&path)?;
    let metadata = std::fs::metadata(&full).map_err(|_| ToolError::NotFound {
        what: "file",
        path: path.clone(),
    })?;
    if metadata.is_dir() {
        return Err(ToolError::IsDirectory { path });
    }

    Ok(Mutation::new(
        "Delete file",
        format!("File: {path}\n{UNDO_WARNING}"),
        Operation::DeleteFile { full, path },
    ))
}

pub(super) fn plan_delete_directory(ctx: &ToolContext, args: PathArgs) -> Result<Mutation, ToolError> {
    let path = required(args.path, "path")?;
    let full = ctx.resolve_writable_dir(&path)?;
    if full == ctx.root() {
        return Err(ToolError::InvalidArgument {
            argument: "path".to_string(),
            reason: "refusing to delete the project root".to_string(),
        });
    }
    let metadata = std::fs::metadata(&full).map_err(|_| ToolError::NotFound {
        what: "directory",
        path: path.clone(),
    })?;
    if !metadata.is_dir() {
        return Err(ToolError::NotADirectory { path });
    }

    Ok(Mutation::new(
        "Delete directory",
        format!(
            "Directory: {path}\n⚠️  This will delete the directory and ALL its contents! This action cannot be undone!"
        ),
        Operation::DeleteDirectory { full, path },
    ))
}

/// Shared validation for move and copy.
fn plan_transfer(
    ctx: &ToolContext,
    args: TransferArgs,
) -> Result<(PathBuf, PathBuf, String, String, String), ToolError> {
    let source = required(args.source, "source")?;
    let destination = required(args.destination, "destination")?;
    let from = ctx.resolve_writable(&source)?;
    let to = ctx.resolve_writable(&destination)?;

    if !from.exists() {
        return Err(ToolError::NotFound {
            what: "source file",
            path: source,
        });
    }

    let mut description = format!("Source: {source}\nDestination: {destination}");
    if to.exists() {
        description.push('\n');
        description.push_str(OVERWRITE_WARNING);
    }
    Ok((from, to, source, destination, description))
}

pub(super) fn plan_move(ctx: &ToolContext, args: TransferArgs) -> Result<Mutation, ToolError> {
    let (from, to, source, destination, description) = plan_transfer(ctx, args)?;
    Ok(Mutation::new(
        "Move/rename file",
        description,
        Operation::Move {
            from,
            to,
            source,
            destination,
        },
    ))
}

pub(super) fn plan_copy(ctx: &ToolContext, args: TransferArgs) -> Result<Mutation, ToolError> {
    let (from, to, source, destination, description) = plan_transfer(ctx, args)?;
    if from.is_dir() {
        return Err(ToolError::IsDirectory { path: source });
    }
    Ok(Mutation::new(
        "Copy file",
        description,
        Operation::Copy {
            from,
            to,
            source,
            destination,
        },
    ))
}

pub(super) fn plan_execute(ctx: &ToolContext, args: ExecuteArgs) -> Result<Mutation, ToolError> {
    let command = required(args.command, "command")?;

    let mut description = format!("Command: {command}");
    if let Some(what) = args.description.filter(|d| !d.trim().is_empty()) {
        description.push_str(&format!("\nDescription: {what}"));
    }
    description.push_str(&format!("\nWorking directory: {}", ctx.root().display()));

    Ok(Mutation::new(
        "Execute command",
        description,
        Operation::Execute {
            command,
            cwd: ctx.root().to_path_buf(),
        },
    ))
}

// ─── Shell ───────────────────────────────────────────────────────────────────

/// Run `command` through the platform shell. A non-zero exit is reported in
/// the result, not as an error.
async fn run_shell(command: &str, cwd: &std::path::Path) -> Result<Value, ToolError> {
    #[cfg(windows)]
    let mut shell = {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    };
    #[cfg(not(windows))]
    let mut shell = {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    let output = shell
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| ToolError::CommandFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    tracing::debug!(command, exit_code, "Shell command finished");

    Ok(json!({
        "command": command,
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
        "exit_code": exit_code,
        "success": output.status.success(),
    }))
}
