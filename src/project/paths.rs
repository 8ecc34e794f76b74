//! Path helpers shared by every filesystem tool.
//!
//! All paths handed in by the model are project-relative (or absolute) text.
//! [`resolve_path`] is the single gate that turns them into filesystem paths,
//! rejecting anything that lands outside the project root before any syscall.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use super::errors::ProjectError;

/// Files larger than this are read only up to this many bytes.
pub const MAX_FILE_SIZE: u64 = 200 * 1024;

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve `path` against `root`, refusing anything outside the root.
///
/// Resolution is lexical: `.` and `..` are folded without touching the
/// filesystem, so nonexistent targets resolve too.
pub fn resolve_path(root: &Path, path: &str) -> Result<PathBuf, ProjectError> {
    let root = normalize(root);
    let candidate = Path::new(path);
    let resolved = if candidate.is_absolute() {
        normalize(candidate)
    } else {
        normalize(&root.join(candidate))
    };

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(ProjectError::PathOutsideRoot {
            path: path.to_string(),
        })
    }
}

/// Fold `.` and `..` components lexically.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Project-relative form of `full`, with `/` separators.
///
/// Paths outside `root` are returned unchanged.
pub fn relative_to_root(root: &Path, full: &Path) -> String {
    let relative = full.strip_prefix(root).unwrap_or(full);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ─── Ignore Rules ────────────────────────────────────────────────────────────

/// Whether `path` matches any ignore pattern.
///
/// A pattern matches when it is a prefix of the path, a glob matching the
/// path's base name, or a substring of the path. Blank patterns are skipped.
pub fn should_ignore(path: &str, patterns: &[String]) -> bool {
    let normalized = path.replace('\\', "/");
    let base_name = normalized.rsplit('/').next().unwrap_or(&normalized);

    patterns.iter().any(|pattern| {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return false;
        }
        normalized.starts_with(pattern)
            || glob::Pattern::new(pattern)
                .map(|p| p.matches(base_name))
                .unwrap_or(false)
            || normalized.contains(pattern)
    })
}

/// Like [`should_ignore`] for a directory, which also matches directory
/// patterns such as `vendor/` against its own path.
pub fn should_ignore_dir(path: &str, patterns: &[String]) -> bool {
    let as_dir = format!("{}/", path.trim_end_matches('/'));
    should_ignore(path, patterns) || should_ignore(&as_dir, patterns)
}

// ─── Extensions ──────────────────────────────────────────────────────────────

/// Lowercased extension including the dot, e.g. `".go"`.
///
/// Dot-files without a further dot (`.gitignore`) have no extension.
pub fn file_extension(path: &str) -> String {
    let base = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(rest) = base.strip_prefix('.') {
        if !rest.contains('.') {
            return String::new();
        }
    }
    match base.rfind('.') {
        Some(pos) => base[pos..].to_lowercase(),
        None => String::new(),
    }
}

/// Fenced-code language for an extension (with dot), `text` when unknown.
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext {
        ".go" => "go",
        ".php" => "php",
        ".js" | ".jsx" => "javascript",
        ".ts" | ".tsx" => "typescript",
        ".sh" | ".bash" => "bash",
        ".yml" | ".yaml" => "yaml",
        ".json" => "json",
        ".md" => "markdown",
        ".sql" => "sql",
        ".html" => "html",
        ".css" => "css",
        ".dockerfile" => "dockerfile",
        ".rb" => "ruby",
        ".py" => "python",
        ".java" => "java",
        ".c" | ".h" => "c",
        ".cpp" | ".hpp" => "cpp",
        ".rs" => "rust",
        _ => "text",
    }
}

// ─── File I/O ────────────────────────────────────────────────────────────────

/// Contents of a file, possibly cut at [`MAX_FILE_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub content: String,
    pub truncated: bool,
}

/// Read a project file, capped at [`MAX_FILE_SIZE`] bytes.
pub fn read_file(root: &Path, path: &str) -> Result<FileContent, ProjectError> {
    let full = resolve_path(root, path)?;
    let metadata = std::fs::metadata(&full).map_err(|_| ProjectError::NotFound {
        path: path.to_string(),
    })?;
    if metadata.is_dir() {
        return Err(ProjectError::IsDirectory {
            path: path.to_string(),
        });
    }

    let file = std::fs::File::open(&full).map_err(|e| ProjectError::io("open", path, e))?;
    let mut bytes = Vec::with_capacity(metadata.len().min(MAX_FILE_SIZE) as usize);
    file.take(MAX_FILE_SIZE)
        .read_to_end(&mut bytes)
        .map_err(|e| ProjectError::io("read", path, e))?;

    Ok(FileContent {
        content: String::from_utf8_lossy(&bytes).into_owned(),
        truncated: metadata.len() > MAX_FILE_SIZE,
    })
}

/// Read lines `start..=end` (1-based) of a project file.
///
/// `start` below 1 is raised to 1 and `end` past the last line is lowered to
/// it; a start after the clamped end is an error.
pub fn read_file_range(root: &Path, path: &str, start: i64, end: i64) -> Result<String, ProjectError> {
    let full = resolve_path(root, path)?;
    let data = std::fs::read(&full).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProjectError::NotFound {
            path: path.to_string(),
        },
        _ => ProjectError::io("read", path, e),
    })?;
    let text = String::from_utf8_lossy(&data);
    let lines: Vec<&str> = text.split('\n').collect();

    let start = start.max(1);
    let end = end.min(lines.len() as i64);
    if start > end {
        return Err(ProjectError::InvalidRange { start, end });
    }

    Ok(lines[(start - 1) as usize..end as usize].join("\n"))
}

/// Write `content` to a project file, creating parent directories.
pub fn write_file(root: &Path, path: &str, content: &str) -> Result<(), ProjectError> {
    let full = resolve_path(root, path)?;
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ProjectError::io("create directory for", path, e))?;
    }
    std::fs::write(&full, content).map_err(|e| ProjectError::io("write", path, e))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_relative_path() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_path(dir.path(), "a/b.go").unwrap();
        assert_eq!(resolved, dir.path().join("a/b.go"));
    }

    #[test]
    fn test_resolve_rejects_parent_traversal() {
        let dir = TempDir::new().unwrap();
        let err = resolve_path(dir.path(), "../../etc/passwd").unwrap_err();
        assert!(matches!(err, ProjectError::PathOutsideRoot { .. }));
    }

    #[test]
    fn test_resolve_rejects_absolute_outside_root() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_path(dir.path(), "/etc/passwd").is_err());
    }

    #[test]
    fn test_resolve_accepts_absolute_inside_root() {
        let dir = TempDir::new().unwrap();
        let inside = dir.path().join("src/main.rs");
        let resolved = resolve_path(dir.path(), &inside.to_string_lossy()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[test]
    fn test_resolve_folds_inner_parent() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_path(dir.path(), "src/../lib/./x.rs").unwrap();
        assert_eq!(resolved, dir.path().join("lib/x.rs"));
    }

    #[test]
    fn test_resolve_rejects_sibling_with_common_prefix() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("app");
        assert!(resolve_path(&root, "../app2/secret").is_err());
    }

    #[test]
    fn test_resolve_empty_is_root() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_path(dir.path(), "").unwrap(), dir.path());
    }

    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/work/proj");
        assert_eq!(relative_to_root(root, Path::new("/work/proj/src/a.rs")), "src/a.rs");
    }

    #[test]
    fn test_should_ignore_prefix_glob_and_substring() {
        let p = patterns(&["vendor/", "*.log", "node_modules/", "  ", ""]);
        assert!(should_ignore("vendor/pkg/a.go", &p));
        assert!(should_ignore("logs/debug.log", &p));
        assert!(should_ignore("web/node_modules/react/index.js", &p));
        assert!(!should_ignore("src/main.rs", &p));
    }

    #[test]
    fn test_directory_pattern_matches_the_directory_itself() {
        let p = patterns(&["vendor/", ".git/"]);
        assert!(!should_ignore("vendor", &p));
        assert!(should_ignore_dir("vendor", &p));
        assert!(should_ignore_dir(".git", &p));
        assert!(should_ignore_dir("web/vendor/", &p));
        assert!(!should_ignore_dir("vendors", &p));
        assert!(!should_ignore_dir("src", &p));
    }

    #[test]
    fn test_should_ignore_normalizes_backslashes() {
        assert!(should_ignore("vendor\\pkg\\a.go", &patterns(&["vendor/"])));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("src/Main.GO"), ".go");
        assert_eq!(file_extension(".gitignore"), "");
        assert_eq!(file_extension("config/.env.local"), ".local");
        assert_eq!(file_extension("Makefile"), "");
    }

    #[test]
    fn test_language_for_extension() {
        assert_eq!(language_for_extension(".tsx"), "typescript");
        assert_eq!(language_for_extension(".hpp"), "cpp");
        assert_eq!(language_for_extension(".xyz"), "text");
    }

    #[test]
    fn test_read_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "Hello, World!").unwrap();
        let file = read_file(dir.path(), "test.txt").unwrap();
        assert_eq!(file.content, "Hello, World!");
        assert!(!file.truncated);
    }

    #[test]
    fn test_read_file_missing_and_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("dir")).unwrap();
        assert!(matches!(
            read_file(dir.path(), "nonexistent.txt"),
            Err(ProjectError::NotFound { .. })
        ));
        assert!(matches!(
            read_file(dir.path(), "dir"),
            Err(ProjectError::IsDirectory { .. })
        ));
    }

    #[test]
    fn test_read_file_truncates_large_files() {
        let dir = TempDir::new().unwrap();
        let big = "a".repeat(MAX_FILE_SIZE as usize + 100);
        std::fs::write(dir.path().join("big.txt"), &big).unwrap();
        let file = read_file(dir.path(), "big.txt").unwrap();
        assert!(file.truncated);
        assert_eq!(file.content.len(), MAX_FILE_SIZE as usize);
    }

    #[test]
    fn test_read_file_range() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("m.txt"), "line1\nline2\nline3\nline4\nline5").unwrap();
        assert_eq!(
            read_file_range(dir.path(), "m.txt", 2, 4).unwrap(),
            "line2\nline3\nline4"
        );
        assert_eq!(read_file_range(dir.path(), "m.txt", 0, 99).unwrap().lines().count(), 5);
        let err = read_file_range(dir.path(), "m.txt", 5, 2).unwrap_err();
        assert_eq!(err.to_string(), "invalid range: start line 5 is after end line 2");
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "deep/nested/out.txt", "data").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("deep/nested/out.txt")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_write_file_outside_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(write_file(dir.path(), "../escape.txt", "x").is_err());
    }
}
