//! Read-only project index.
//!
//! Built once at startup by walking the project root. Records every
//! non-ignored path with its size and extension, plus the symbols found in
//! code files, and arranges directories into a tree for browsing.

pub mod parsers;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::project::paths::{file_extension, relative_to_root};
use crate::project::{should_ignore, should_ignore_dir};

pub use parsers::{Symbol, SymbolParser};

/// Extensions treated as source code. Only some of them have a grammar.
const CODE_EXTENSIONS: &[&str] = &[
    ".go", ".php", ".js", ".ts", ".jsx", ".tsx", ".c", ".cpp", ".cc", ".cxx", ".h", ".hpp", ".lua",
    ".py", ".java", ".rb", ".rs", ".swift", ".kt", ".scala", ".cs", ".dart", ".sh", ".bash", ".zsh",
];

pub fn is_code_extension(ext: &str) -> bool {
    CODE_EXTENSIONS.contains(&ext)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("file not found in index: {path}")]
    FileNotIndexed { path: String },

    #[error("failed to compile symbol patterns: {reason}")]
    Pattern { reason: String },
}

/// One indexed path.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub extension: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Symbol>,
}

/// A directory in the index tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Project-relative path; empty for the root.
    pub path: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, TreeNode>,
    /// Project-relative paths of the files directly inside this directory.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl TreeNode {
    fn directory(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            is_dir: true,
            children: BTreeMap::new(),
            files: Vec::new(),
        }
    }
}

pub struct ProjectIndex {
    files: HashMap<String, FileEntry>,
    tree: TreeNode,
}

impl ProjectIndex {
    /// Walk `root` and index everything not matched by `ignore`.
    ///
    /// Unreadable directories and files are skipped silently.
    pub fn build(root: &Path, ignore: &[String]) -> Result<Self, IndexError> {
        let parser = SymbolParser::new().map_err(|e| IndexError::Pattern {
            reason: e.to_string(),
        })?;

        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut index = Self {
            files: HashMap::new(),
            tree: TreeNode::directory(&root_name, String::new()),
        };
        index.walk(root, root, ignore, &parser);

        tracing::debug!(
            root = %root.display(),
            entries = index.files.len(),
            "Project indexed"
        );
        Ok(index)
    }

    fn walk(&mut self, root: &Path, dir: &Path, ignore: &[String], parser: &SymbolParser) {
        let mut entries: Vec<_> = match fs::read_dir(dir) {
            Ok(read) => read.filter_map(Result::ok).collect(),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                return;
            }
        };
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let full = entry.path();
            let relative = relative_to_root(root, &full);
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let ignored = if metadata.is_dir() {
                should_ignore_dir(&relative, ignore)
            } else {
                should_ignore(&relative, ignore)
            };
            if ignored {
                continue;
            }

            let extension = file_extension(&relative);
            let mut file = FileEntry {
                path: relative.clone(),
                size: metadata.len(),
                extension,
                is_dir: metadata.is_dir(),
                classes: Vec::new(),
                functions: Vec::new(),
                symbols: Vec::new(),
            };

            if !file.is_dir && is_code_extension(&file.extension) {
                if let Ok(bytes) = fs::read(&full) {
                    let content = String::from_utf8_lossy(&bytes);
                    file.symbols = parser.parse(&file.extension, &content);
                    file.classes = file
                        .symbols
                        .iter()
                        .filter(|s| s.is_class_like())
                        .map(|s| s.name.clone())
                        .collect();
                    file.functions = file
                        .symbols
                        .iter()
                        .filter(|s| s.is_function_like())
                        .map(|s| s.name.clone())
                        .collect();
                }
            }

            let is_dir = file.is_dir;
            self.insert_into_tree(&relative, is_dir);
            self.files.insert(relative, file);

            if is_dir {
                self.walk(root, &full, ignore, parser);
            }
        }
    }

    fn insert_into_tree(&mut self, path: &str, is_dir: bool) {
        let parts: Vec<&str> = path.split('/').collect();
        let mut current = &mut self.tree;

        for (i, part) in parts.iter().enumerate() {
            let is_last = i == parts.len() - 1;
            if is_last && !is_dir {
                current.files.push(path.to_string());
                return;
            }
            let node_path = parts[..=i].join("/");
            current = current
                .children
                .entry((*part).to_string())
                .or_insert_with(|| TreeNode::directory(part, node_path));
        }
    }

    /// Subtree at `path`; `""` and `"."` mean the root.
    pub fn get_tree(&self, path: &str) -> Result<&TreeNode, IndexError> {
        if path.is_empty() || path == "." {
            return Ok(&self.tree);
        }

        let mut current = &self.tree;
        for part in path.trim_matches('/').split('/').filter(|p| !p.is_empty()) {
            current = current
                .children
                .get(part)
                .ok_or_else(|| IndexError::PathNotFound {
                    path: path.to_string(),
                })?;
        }
        Ok(current)
    }

    pub fn get_file_symbols(&self, path: &str) -> Result<&[Symbol], IndexError> {
        self.files
            .get(path)
            .map(|f| f.symbols.as_slice())
            .ok_or_else(|| IndexError::FileNotIndexed {
                path: path.to_string(),
            })
    }

    /// Every indexed path, directories included, sorted.
    pub fn get_all_file_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.files.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn get_file_info(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/api")).unwrap();
        fs::create_dir_all(root.join("vendor/lib")).unwrap();
        fs::write(root.join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
        fs::write(
            root.join("src/api/server.py"),
            "class Server:\n    def start(self):\n        pass\n",
        )
        .unwrap();
        fs::write(root.join("src/notes.txt"), "def not_code():").unwrap();
        fs::write(root.join("vendor/lib/dep.go"), "func Dep() {}\n").unwrap();
        dir
    }

    fn ignore() -> Vec<String> {
        vec!["vendor/".to_string()]
    }

    #[test]
    fn test_build_records_files_and_directories() {
        let dir = sample_project();
        let index = ProjectIndex::build(dir.path(), &ignore()).unwrap();

        assert_eq!(
            index.get_all_file_paths(),
            vec!["main.go", "src", "src/api", "src/api/server.py", "src/notes.txt"]
        );
        let api = index.get_file_info("src/api").unwrap();
        assert!(api.is_dir);
        let notes = index.get_file_info("src/notes.txt").unwrap();
        assert_eq!(notes.extension, ".txt");
        assert!(notes.symbols.is_empty());
    }

    #[test]
    fn test_ignored_directories_are_skipped_entirely() {
        let dir = sample_project();
        let index = ProjectIndex::build(dir.path(), &ignore()).unwrap();
        assert!(index.get_file_info("vendor").is_none());
        assert!(index.get_file_info("vendor/lib/dep.go").is_none());
        assert!(index.get_tree("vendor").is_err());
    }

    #[test]
    fn test_symbols_split_into_classes_and_functions() {
        let dir = sample_project();
        let index = ProjectIndex::build(dir.path(), &ignore()).unwrap();
        let server = index.get_file_info("src/api/server.py").unwrap();
        assert_eq!(server.classes, vec!["Server"]);
        assert_eq!(server.functions, vec!["start"]);

        let symbols = index.get_file_symbols("main.go").unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "main");
        assert_eq!(symbols[0].line, 3);
    }

    #[test]
    fn test_tree_navigation() {
        let dir = sample_project();
        let index = ProjectIndex::build(dir.path(), &ignore()).unwrap();

        let root = index.get_tree("").unwrap();
        assert_eq!(root.path, "");
        assert_eq!(root.files, vec!["main.go"]);
        assert_eq!(root.children.keys().collect::<Vec<_>>(), vec!["src"]);
        assert!(std::ptr::eq(root, index.get_tree(".").unwrap()));

        let api = index.get_tree("/src/api/").unwrap();
        assert_eq!(api.name, "api");
        assert_eq!(api.path, "src/api");
        assert_eq!(api.files, vec!["src/api/server.py"]);
    }

    #[test]
    fn test_missing_lookups_report_the_path() {
        let dir = sample_project();
        let index = ProjectIndex::build(dir.path(), &ignore()).unwrap();

        let err = index.get_tree("src/missing").unwrap_err();
        assert_eq!(err.to_string(), "path not found: src/missing");

        let err = index.get_file_symbols("nope.go").unwrap_err();
        assert_eq!(err.to_string(), "file not found in index: nope.go");
    }

    #[test]
    fn test_code_extensions() {
        assert!(is_code_extension(".swift"));
        assert!(is_code_extension(".zsh"));
        assert!(!is_code_extension(".md"));
    }
}
