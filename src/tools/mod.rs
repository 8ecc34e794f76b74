//! Project tools the model can call.
//!
//! Two classes with different contracts:
//! - **Read-only** tools run immediately via [`run_read_only`].
//! - **Mutating** tools are first turned into a [`Mutation`] by
//!   [`plan_mutation`], which validates arguments and paths and describes the
//!   effect. The caller asks the user, then calls [`Mutation::apply`].
//!
//! Every handler decodes its JSON arguments into a small typed record and
//! returns a JSON object as text.

pub mod catalog;
pub mod errors;
mod files;
mod git;
mod mutation;
mod project_info;
pub(crate) mod search;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::indexer::ProjectIndex;
use crate::project::paths::{normalize, relative_to_root};
use crate::project::{resolve_path, should_ignore, should_ignore_dir};

pub use catalog::all_tools;
pub use errors::ToolError;
pub use mutation::Mutation;

// ─── Context ─────────────────────────────────────────────────────────────────

/// What every tool handler can see of the project.
#[derive(Clone)]
pub struct ToolContext {
    root: PathBuf,
    ignore: Vec<String>,
    index: Option<Arc<ProjectIndex>>,
}

impl ToolContext {
    pub fn new(root: &Path, ignore: Vec<String>, index: Option<Arc<ProjectIndex>>) -> Self {
        Self {
            root: normalize(root),
            ignore,
            index,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path, refusing anything outside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        Ok(resolve_path(&self.root, path)?)
    }

    /// Like [`resolve`](Self::resolve), and also refuse ignored paths.
    ///
    /// Existing directories are checked against directory patterns too.
    pub fn resolve_writable(&self, path: &str) -> Result<PathBuf, ToolError> {
        let full = self.resolve(path)?;
        let is_dir = full.is_dir();
        self.refuse_ignored(path, &full, is_dir)?;
        Ok(full)
    }

    /// [`resolve_writable`](Self::resolve_writable) for a path that is or
    /// will become a directory.
    pub fn resolve_writable_dir(&self, path: &str) -> Result<PathBuf, ToolError> {
        let full = self.resolve(path)?;
        self.refuse_ignored(path, &full, true)?;
        Ok(full)
    }

    fn refuse_ignored(&self, path: &str, full: &Path, is_dir: bool) -> Result<(), ToolError> {
        if self.is_ignored(full, is_dir) {
            return Err(ToolError::Ignored {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    pub fn relative(&self, full: &Path) -> String {
        relative_to_root(&self.root, full)
    }

    fn is_ignored(&self, full: &Path, is_dir: bool) -> bool {
        let relative = self.relative(full);
        if relative.is_empty() {
            return false;
        }
        if is_dir {
            should_ignore_dir(&relative, &self.ignore)
        } else {
            should_ignore(&relative, &self.ignore)
        }
    }

    fn index(&self) -> Result<&ProjectIndex, ToolError> {
        self.index.as_deref().ok_or(ToolError::IndexUnavailable)
    }

    /// Visit every non-ignored file under `start`, depth first, in name order.
    ///
    /// Ignored directories are not descended into. Unreadable entries are
    /// skipped.
    fn walk_files(&self, start: &Path, visit: &mut dyn FnMut(&str, &Path)) {
        let mut entries: Vec<_> = match std::fs::read_dir(start) {
            Ok(read) => read.filter_map(Result::ok).collect(),
            Err(_) => return,
        };
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let full = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if self.is_ignored(&full, file_type.is_dir()) {
                continue;
            }
            if file_type.is_dir() {
                self.walk_files(&full, visit);
            } else {
                let relative = self.relative(&full);
                visit(&relative, &full);
            }
        }
    }
}

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ReadOnly,
    /// Needs user confirmation before running.
    Mutating,
}

/// Kind of a known tool, `None` for unknown names.
pub fn kind_of(name: &str) -> Option<ToolKind> {
    match name {
        "read_file" | "list_directory" | "grep" | "read_file_lines" | "get_tree_list"
        | "get_file_symbols" | "find_files" | "find_files_by_extension" | "search_symbols"
        | "get_project_stats" | "get_file_info" | "find_dependencies" | "git_status"
        | "git_diff" | "find_symbol_references" => Some(ToolKind::ReadOnly),
        "write_file" | "create_file" | "update_file" | "string_replace" | "create_directory"
        | "delete_file" | "delete_directory" | "move_file" | "copy_file" | "execute" => {
            Some(ToolKind::Mutating)
        }
        _ => None,
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Run a read-only tool and return its JSON result.
pub async fn run_read_only(ctx: &ToolContext, name: &str, args: &Value) -> Result<String, ToolError> {
    let result = match name {
        "read_file" => files::read_file(ctx, decode(args)?)?,
        "list_directory" => files::list_directory(ctx, decode(args)?)?,
        "read_file_lines" => files::read_file_lines(ctx, decode(args)?)?,
        "get_file_info" => files::get_file_info(ctx, decode(args)?)?,
        "find_files" => files::find_files(ctx, decode(args)?)?,
        "find_files_by_extension" => files::find_files_by_extension(ctx, decode(args)?)?,
        "grep" => search::grep(ctx, decode(args)?).await?,
        "find_symbol_references" => search::find_symbol_references(ctx, decode(args)?).await?,
        "get_tree_list" => project_info::get_tree_list(ctx, decode(args)?)?,
        "get_file_symbols" => project_info::get_file_symbols(ctx, decode(args)?)?,
        "search_symbols" => project_info::search_symbols(ctx, decode(args)?)?,
        "get_project_stats" => project_info::get_project_stats(ctx)?,
        "find_dependencies" => project_info::find_dependencies(ctx),
        "git_status" => git::git_status(ctx).await?,
        "git_diff" => git::git_diff(ctx, decode(args)?).await?,
        _ => {
            return Err(ToolError::UnknownTool {
                name: name.to_string(),
            })
        }
    };
    Ok(result.to_string())
}

/// Validate a mutating call and describe it, without touching anything.
pub fn plan_mutation(ctx: &ToolContext, name: &str, args: &Value) -> Result<Mutation, ToolError> {
    match name {
        "write_file" => mutation::plan_write(ctx, decode(args)?),
        "create_file" => mutation::plan_create(ctx, decode(args)?),
        "update_file" => mutation::plan_update(ctx, decode(args)?),
        "string_replace" => mutation::plan_replace(ctx, decode(args)?),
        "create_directory" => mutation::plan_create_directory(ctx, decode(args)?),
        "delete_file" => mutation::plan_delete_file(ctx, decode(args)?),
        "delete_directory" => mutation::plan_delete_directory(ctx, decode(args)?),
        "move_file" => mutation::plan_move(ctx, decode(args)?),
        "copy_file" => mutation::plan_copy(ctx, decode(args)?),
        "execute" => mutation::plan_execute(ctx, decode(args)?),
        _ => Err(ToolError::UnknownTool {
            name: name.to_string(),
        }),
    }
}

// ─── Argument Decoding ───────────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArgument {
        argument: "arguments".to_string(),
        reason: e.to_string(),
    })
}

/// A required string argument; absent and empty are the same.
fn required(value: Option<String>, argument: &'static str) -> Result<String, ToolError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ToolError::MissingArgument { argument }),
    }
}

/// Argument carrying only an optional `path`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathArgs {
    path: Option<String>,
}

/// Line numbers arrive as JSON numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LineNumber {
    Number(f64),
    Text(String),
}

impl LineNumber {
    fn resolve(value: Option<LineNumber>, argument: &'static str) -> Result<i64, ToolError> {
        match value {
            None => Err(ToolError::MissingArgument { argument }),
            Some(LineNumber::Number(n)) => Ok(n as i64),
            Some(LineNumber::Text(s)) => s.trim().parse().map_err(|e: std::num::ParseIntError| {
                ToolError::InvalidArgument {
                    argument: argument.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    /// Project with a couple of files and an ignored vendor directory.
    pub(crate) fn fixture() -> (TempDir, ToolContext) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("vendor/dep")).unwrap();
        std::fs::write(root.join("src/main.go"), "package main\n\nfunc main() {}\n").unwrap();
        std::fs::write(root.join("src/util.go"), "package main\n\nfunc helper() {}\n").unwrap();
        std::fs::write(root.join("README.md"), "# Demo\n").unwrap();
        std::fs::write(root.join("vendor/dep/lib.go"), "func Lib() {}\n").unwrap();
        let ctx = ToolContext::new(root, vec!["vendor/".to_string()], None);
        (dir, ctx)
    }

    pub(crate) fn with_index(ctx: ToolContext) -> ToolContext {
        let index = ProjectIndex::build(&ctx.root, &ctx.ignore).unwrap();
        ToolContext {
            index: Some(Arc::new(index)),
            ..ctx
        }
    }

    pub(crate) fn parse(result: &str) -> Value {
        serde_json::from_str(result).unwrap()
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of("read_file"), Some(ToolKind::ReadOnly));
        assert_eq!(kind_of("execute"), Some(ToolKind::Mutating));
        assert_eq!(kind_of("rm_rf"), None);
    }

    #[test]
    fn test_resolve_writable_rejects_ignored_paths() {
        let (_dir, ctx) = fixture();
        assert!(matches!(
            ctx.resolve_writable("vendor/dep/lib.go"),
            Err(ToolError::Ignored { .. })
        ));
        assert!(ctx.resolve_writable("src/new.go").is_ok());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, ctx) = fixture();
        assert!(matches!(
            ctx.resolve("../outside.txt"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
    }

    #[test]
    fn test_walk_skips_ignored_directories() {
        let (_dir, ctx) = fixture();
        let mut seen = Vec::new();
        ctx.walk_files(ctx.root(), &mut |rel, _| seen.push(rel.to_string()));
        assert_eq!(seen, vec!["README.md", "src/main.go", "src/util.go"]);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_dir, ctx) = fixture();
        let err = run_read_only(&ctx, "nope", &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "unknown tool: nope");
        assert!(plan_mutation(&ctx, "nope", &json!({})).is_err());
    }

    #[tokio::test]
    async fn test_wrong_argument_type_is_invalid_argument() {
        let (_dir, ctx) = fixture();
        let err = run_read_only(&ctx, "read_file", &json!({"path": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }

    #[test]
    fn test_line_number_accepts_numbers_and_strings() {
        let n: Option<LineNumber> = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(LineNumber::resolve(n, "start_line").unwrap(), 12);
        let s: Option<LineNumber> = serde_json::from_value(json!(" 7 ")).unwrap();
        assert_eq!(LineNumber::resolve(s, "start_line").unwrap(), 7);
        let bad: Option<LineNumber> = serde_json::from_value(json!("seven")).unwrap();
        assert!(LineNumber::resolve(bad, "start_line").is_err());
        assert!(matches!(
            LineNumber::resolve(None, "end_line"),
            Err(ToolError::MissingArgument { argument: "end_line" })
        ));
    }
}
