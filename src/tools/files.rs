//! Read-only filesystem tools.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{required, LineNumber, PathArgs, ToolContext, ToolError};
use crate::project::paths::{self, file_extension};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LineRangeArgs {
    path: Option<String>,
    start_line: Option<LineNumber>,
    end_line: Option<LineNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FindFilesArgs {
    pattern: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FindByExtensionArgs {
    extension: Option<String>,
    path: Option<String>,
}

pub(super) fn read_file(ctx: &ToolContext, args: PathArgs) -> Result<Value, ToolError> {
    let path = required(args.path, "path")?;
    let file = paths::read_file(ctx.root(), &path)?;

    let mut result = json!({
        "path": path,
        "content": file.content,
        "truncated": file.truncated,
    });
    if file.truncated {
        result["note"] = json!("File was truncated to first 200KB");
    }
    Ok(result)
}

/// Check if a file is hidden (cross-platform).
fn is_hidden(name: &str, _metadata: &std::fs::Metadata) -> bool {
    #[cfg(not(target_os = "windows"))]
    {
        name.starts_with('.')
    }
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
        name.starts_with('.') || _metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
    }
}

/// Files and directories directly inside `path`, hidden entries skipped.
pub(super) fn list_directory(ctx: &ToolContext, args: PathArgs) -> Result<Value, ToolError> {
    let path = args.path.unwrap_or_default();
    let full = ctx.resolve(&path)?;

    let read_dir = std::fs::read_dir(&full).map_err(|e| ToolError::io("read directory", &path, e))?;
    let mut entries: Vec<_> = read_dir.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if is_hidden(&name, &metadata) {
            continue;
        }

        if metadata.is_dir() {
            dirs.push(json!({ "name": name, "size": metadata.len() }));
        } else {
            files.push(json!({
                "name": name,
                "size": metadata.len(),
                "extension": file_extension(&name),
            }));
        }
    }

    Ok(json!({ "path": path, "files": files, "dirs": dirs }))
}

pub(super) fn read_file_lines(ctx: &ToolContext, args: LineRangeArgs) -> Result<Value, ToolError> {
    let path = required(args.path, "path")?;
    let start = LineNumber::resolve(args.start_line, "start_line")?;
    let end = LineNumber::resolve(args.end_line, "end_line")?;

    let content = paths::read_file_range(ctx.root(), &path, start, end)?;
    Ok(json!({
        "path": path,
        "start_line": start,
        "end_line": end,
        "content": content,
    }))
}

/// Size, timestamps, permissions and line count, plus indexed symbols when
/// the index knows the file.
pub(super) fn get_file_info(ctx: &ToolContext, args: PathArgs) -> Result<Value, ToolError> {
    let path = required(args.path, "path")?;
    let full = ctx.resolve(&path)?;
    let metadata = std::fs::metadata(&full).map_err(|_| ToolError::NotFound {
        what: "file",
        path: path.clone(),
    })?;

    let line_count = if metadata.is_dir() {
        0
    } else {
        std::fs::read(&full)
            .map(|data| data.iter().filter(|&&b| b == b'\n').count() + 1)
            .unwrap_or(0)
    };

    let modified_time = metadata
        .modified()
        .map(|t| {
            chrono::DateTime::<chrono::Local>::from(t)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default();

    let name = full
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut result = json!({
        "path": path,
        "name": name,
        "size": metadata.len(),
        "is_dir": metadata.is_dir(),
        "mode": format_mode(&metadata),
        "modified_time": modified_time,
        "extension": file_extension(&path),
        "line_count": line_count,
    });

    if let Some(index) = ctx.index.as_deref() {
        if let Some(entry) = index.get_file_info(&ctx.relative(&full)) {
            result["classes"] = json!(entry.classes);
            result["functions"] = json!(entry.functions);
            result["symbols_count"] = json!(entry.symbols.len());
        }
    }
    Ok(result)
}

/// `ls -l` style permission string, e.g. `-rw-r--r--`.
#[cfg(unix)]
fn format_mode(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(if metadata.is_dir() { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn format_mode(metadata: &std::fs::Metadata) -> String {
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let write = if metadata.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-r--r--")
}

/// Files whose base name matches a glob.
pub(super) fn find_files(ctx: &ToolContext, args: FindFilesArgs) -> Result<Value, ToolError> {
    let pattern = required(args.pattern, "pattern")?;
    let matcher = glob::Pattern::new(&pattern).map_err(|e| ToolError::InvalidArgument {
        argument: "pattern".to_string(),
        reason: e.to_string(),
    })?;
    let start = ctx.resolve(args.path.as_deref().unwrap_or(""))?;

    let mut matches = Vec::new();
    ctx.walk_files(&start, &mut |relative, full| {
        let base = full
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if matcher.matches(&base) {
            matches.push(relative.to_string());
        }
    });

    Ok(json!({
        "pattern": pattern,
        "path": start.display().to_string(),
        "count": matches.len(),
        "matches": matches,
    }))
}

/// Files with an extension, compared case-insensitively. A missing leading
/// dot is added.
pub(super) fn find_files_by_extension(
    ctx: &ToolContext,
    args: FindByExtensionArgs,
) -> Result<Value, ToolError> {
    let mut extension = required(args.extension, "extension")?;
    if !extension.starts_with('.') {
        extension.insert(0, '.');
    }
    let wanted = extension.to_lowercase();
    let start = ctx.resolve(args.path.as_deref().unwrap_or(""))?;

    let mut matches = Vec::new();
    ctx.walk_files(&start, &mut |relative, _| {
        if file_extension(relative) == wanted {
            matches.push(relative.to_string());
        }
    });

    Ok(json!({
        "extension": extension,
        "path": start.display().to_string(),
        "count": matches.len(),
        "matches": matches,
    }))
}
