//! Tools backed by the project index, plus the dependency manifest scan.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{required, PathArgs, ToolContext, ToolError};
use crate::project::paths;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SymbolSearchArgs {
    symbol: Option<String>,
    path: Option<String>,
}

/// Manifest file name and the package manager it belongs to.
const DEPENDENCY_FILES: &[(&str, &str)] = &[
    ("Cargo.toml", "rust/cargo"),
    ("Gemfile", "ruby/bundler"),
    ("build.gradle", "java/gradle"),
    ("composer.json", "php/composer"),
    ("go.mod", "go"),
    ("package.json", "npm/node"),
    ("pom.xml", "java/maven"),
    ("requirements.txt", "python/pip"),
];

const DEPENDENCY_PREVIEW_LINES: usize = 10;

fn language_name(ext: &str) -> Option<&'static str> {
    let name = match ext {
        ".go" => "Go",
        ".php" => "PHP",
        ".js" | ".jsx" => "JavaScript",
        ".ts" | ".tsx" => "TypeScript",
        ".c" => "C",
        ".cpp" | ".hpp" => "C++",
        ".h" => "C/C++",
        ".lua" => "Lua",
        ".py" => "Python",
        ".java" => "Java",
        ".rb" => "Ruby",
        ".rs" => "Rust",
        ".swift" => "Swift",
        ".kt" => "Kotlin",
        ".scala" => "Scala",
        ".cs" => "C#",
        ".dart" => "Dart",
        ".sh" | ".bash" | ".zsh" => "Shell",
        _ => return None,
    };
    Some(name)
}

/// Project-relative index key for a model-supplied path.
fn index_key(ctx: &ToolContext, path: &str) -> Result<String, ToolError> {
    let full = ctx.resolve(path)?;
    Ok(ctx.relative(&full))
}

pub(super) fn get_tree_list(ctx: &ToolContext, args: PathArgs) -> Result<Value, ToolError> {
    let index = ctx.index()?;
    let path = args.path.unwrap_or_default();
    let key = index_key(ctx, &path)?;
    let tree = index.get_tree(&key)?;
    Ok(json!({ "path": path, "tree": tree }))
}

pub(super) fn get_file_symbols(ctx: &ToolContext, args: PathArgs) -> Result<Value, ToolError> {
    let index = ctx.index()?;
    let path = required(args.path, "path")?;
    let symbols = index.get_file_symbols(&index_key(ctx, &path)?)?;
    Ok(json!({
        "path": path,
        "count": symbols.len(),
        "symbols": symbols,
    }))
}

/// Indexed definitions whose name matches `symbol`, ignoring case.
pub(super) fn search_symbols(ctx: &ToolContext, args: SymbolSearchArgs) -> Result<Value, ToolError> {
    let index = ctx.index()?;
    let symbol = required(args.symbol, "symbol")?;
    let prefix = args.path.unwrap_or_default();
    let wanted = symbol.to_lowercase();

    let mut matches = Vec::new();
    for path in index.get_all_file_paths() {
        if !path.starts_with(prefix.as_str()) {
            continue;
        }
        let Some(entry) = index.get_file_info(path) else {
            continue;
        };
        if entry.is_dir {
            continue;
        }
        for sym in entry.symbols.iter().filter(|s| s.name.to_lowercase() == wanted) {
            matches.push(json!({
                "file": path,
                "symbol": sym.name,
                "type": sym.kind,
                "line": sym.line,
                "signature": sym.signature.clone().unwrap_or_default(),
            }));
        }
    }

    Ok(json!({
        "symbol": symbol,
        "path": prefix,
        "count": matches.len(),
        "matches": matches,
    }))
}

/// File and directory counts, size, code lines, and per-extension and
/// per-language breakdowns.
pub(super) fn get_project_stats(ctx: &ToolContext) -> Result<Value, ToolError> {
    let index = ctx.index()?;
    let all_paths = index.get_all_file_paths();

    let mut files = 0usize;
    let mut directories = 0usize;
    let mut total_size = 0u64;
    let mut code_lines = 0usize;
    let mut extensions: BTreeMap<String, usize> = BTreeMap::new();
    let mut languages: BTreeMap<&'static str, usize> = BTreeMap::new();

    for path in &all_paths {
        let Some(entry) = index.get_file_info(path) else {
            continue;
        };
        if entry.is_dir {
            directories += 1;
            continue;
        }

        files += 1;
        total_size += entry.size;
        if !entry.extension.is_empty() {
            *extensions.entry(entry.extension.clone()).or_default() += 1;
        }
        if let Some(language) = language_name(&entry.extension) {
            *languages.entry(language).or_default() += 1;
            if let Ok(data) = std::fs::read(ctx.root().join(path)) {
                code_lines += data.iter().filter(|&&b| b == b'\n').count() + 1;
            }
        }
    }

    Ok(json!({
        "files": files,
        "directories": directories,
        "total_size": total_size,
        "code_lines": code_lines,
        "extensions": extensions,
        "languages": languages,
        "indexed_files": all_paths.len(),
    }))
}

/// Known manifests in the project root with a short preview of each.
pub(super) fn find_dependencies(ctx: &ToolContext) -> Value {
    let mut found = BTreeMap::new();
    for (file_name, manager) in DEPENDENCY_FILES {
        let Ok(file) = paths::read_file(ctx.root(), file_name) else {
            continue;
        };
        let preview: Vec<&str> = file
            .content
            .split('\n')
            .take(DEPENDENCY_PREVIEW_LINES)
            .collect();
        found.insert(
            *file_name,
            json!({
                "manager": manager,
                "path": file_name,
                "content_preview": preview,
            }),
        );
    }

    json!({
        "count": found.len(),
        "dependency_files": found,
    })
}

#[cfg(test)]
mod tests {
    use crate::tools::run_read_only;
    use crate::tools::tests::{fixture, parse, with_index};
    use serde_json::json;

    #[tokio::test]
    async fn test_index_tools_need_an_index() {
        let (_dir, ctx) = fixture();
        let err = run_read_only(&ctx, "get_project_stats", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "project index not available");
    }

    #[tokio::test]
    async fn test_get_tree_list_root_and_subdirectory() {
        let (_dir, ctx) = fixture();
        let ctx = with_index(ctx);

        let v = parse(&run_read_only(&ctx, "get_tree_list", &json!({})).await.unwrap());
        assert_eq!(v["tree"]["files"], json!(["README.md"]));
        assert!(v["tree"]["children"].get("vendor").is_none());

        let v = parse(
            &run_read_only(&ctx, "get_tree_list", &json!({"path": "./src"}))
                .await
                .unwrap(),
        );
        assert_eq!(v["tree"]["files"], json!(["src/main.go", "src/util.go"]));
    }

    #[tokio::test]
    async fn test_get_tree_list_unknown_path() {
        let (_dir, ctx) = fixture();
        let ctx = with_index(ctx);
        let err = run_read_only(&ctx, "get_tree_list", &json!({"path": "missing"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "path not found: missing");
    }

    #[tokio::test]
    async fn test_get_file_symbols() {
        let (_dir, ctx) = fixture();
        let ctx = with_index(ctx);
        let v = parse(
            &run_read_only(&ctx, "get_file_symbols", &json!({"path": "src/util.go"}))
                .await
                .unwrap(),
        );
        assert_eq!(v["count"], 1);
        assert_eq!(v["symbols"][0]["name"], "helper");
        assert_eq!(v["symbols"][0]["type"], "function");
        assert_eq!(v["symbols"][0]["line"], 3);
    }

    #[tokio::test]
    async fn test_search_symbols_case_insensitive() {
        let (_dir, ctx) = fixture();
        let ctx = with_index(ctx);
        let v = parse(
            &run_read_only(&ctx, "search_symbols", &json!({"symbol": "HELPER"}))
                .await
                .unwrap(),
        );
        assert_eq!(v["count"], 1);
        assert_eq!(v["matches"][0]["file"], "src/util.go");
        assert_eq!(v["matches"][0]["signature"], "");
    }

    #[tokio::test]
    async fn test_get_project_stats() {
        let (_dir, ctx) = fixture();
        let ctx = with_index(ctx);
        let v = parse(&run_read_only(&ctx, "get_project_stats", &json!({})).await.unwrap());
        assert_eq!(v["files"], 3);
        assert_eq!(v["directories"], 1);
        assert_eq!(v["languages"]["Go"], 2);
        assert_eq!(v["extensions"][".md"], 1);
        assert_eq!(v["code_lines"], 8);
        assert_eq!(v["indexed_files"], 4);
    }

    #[tokio::test]
    async fn test_find_dependencies() {
        let (dir, ctx) = fixture();
        std::fs::write(dir.path().join("go.mod"), "module demo\n\ngo 1.22\n").unwrap();
        let v = parse(&run_read_only(&ctx, "find_dependencies", &json!({})).await.unwrap());
        assert_eq!(v["count"], 1);
        assert_eq!(v["dependency_files"]["go.mod"]["manager"], "go");
        assert_eq!(
            v["dependency_files"]["go.mod"]["content_preview"][0],
            "module demo"
        );
    }
}
