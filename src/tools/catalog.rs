//! Tool definitions advertised to the model.
//!
//! The catalog is static. Parameter schemas are for the model's benefit;
//! handlers do their own presence checks when decoding arguments.

use serde_json::{json, Map, Value};

use crate::inference::ToolDefinition;

const REL_FILE: &str = "Path to the file relative to project root";
const REL_DIR: &str = "Path to the directory relative to project root";
const REL_DIR_OR_ROOT: &str =
    "Path to the directory relative to project root (empty string for project root)";
const SEARCH_FROM: &str =
    "Path to search from (relative to project root, empty string for project root)";

/// `(name, type, description)` for one parameter.
type Param = (&'static str, &'static str, &'static str);

fn schema(params: &[Param], required: &[&str]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|(name, kind, description)| {
            (
                (*name).to_string(),
                json!({ "type": kind, "description": description }),
            )
        })
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn tool(name: &str, description: &str, params: &[Param], required: &[&str]) -> ToolDefinition {
    ToolDefinition::function(name, description, schema(params, required))
}

/// Every tool the executor understands, in advertising order.
pub fn all_tools() -> Vec<ToolDefinition> {
    let path_param: Param = ("path", "string", REL_FILE);
    let content_param: Param = ("content", "string", "Content to write to the file");
    let source_param: Param = ("source", "string", "Source path relative to project root");
    let destination_param: Param = (
        "destination",
        "string",
        "Destination path relative to project root",
    );

    vec![
        tool(
            "read_file",
            "Read the contents of a file. Path is relative to project root.",
            &[path_param],
            &["path"],
        ),
        tool(
            "list_directory",
            "List files and directories in a directory. Path is relative to project root. If path is empty, lists project root.",
            &[("path", "string", REL_DIR_OR_ROOT)],
            &[],
        ),
        tool(
            "grep",
            "Search for a pattern in files. Searches recursively from the given path (defaults to project root).",
            &[
                ("pattern", "string", "Search pattern (regular expression)"),
                ("path", "string", SEARCH_FROM),
            ],
            &["pattern"],
        ),
        tool(
            "read_file_lines",
            "Read specific lines from a file. Useful for reading a code section.",
            &[
                path_param,
                ("start_line", "integer", "Starting line number (1-based)"),
                ("end_line", "integer", "Ending line number (1-based, inclusive)"),
            ],
            &["path", "start_line", "end_line"],
        ),
        tool(
            "write_file",
            "Write content to a file. Path is relative to project root. Creates the file if it doesn't exist, overwrites if it does. Requires user confirmation.",
            &[path_param, content_param],
            &["path", "content"],
        ),
        tool(
            "create_file",
            "Create a new file with content. Path is relative to project root. Fails if file already exists. Requires user confirmation.",
            &[path_param, content_param],
            &["path", "content"],
        ),
        tool(
            "update_file",
            "Update an existing file by replacing its entire content. Path is relative to project root. Fails if file doesn't exist. Requires user confirmation.",
            &[path_param, ("content", "string", "New content for the file")],
            &["path", "content"],
        ),
        tool(
            "string_replace",
            "Replace all occurrences of a string pattern in a file. Path is relative to project root. Requires user confirmation.",
            &[
                path_param,
                ("old_string", "string", "String pattern to replace"),
                ("new_string", "string", "Replacement string"),
            ],
            &["path", "old_string", "new_string"],
        ),
        tool(
            "create_directory",
            "Create a directory. Path is relative to project root. Creates parent directories if needed. Requires user confirmation.",
            &[("path", "string", REL_DIR)],
            &["path"],
        ),
        tool(
            "get_tree_list",
            "Get a tree view of files and directories starting from a given path. Returns a hierarchical structure excluding ignored files/folders. Path is relative to project root. Use empty string for project root.",
            &[("path", "string", REL_DIR_OR_ROOT)],
            &[],
        ),
        tool(
            "get_file_symbols",
            "Get a list of classes, functions, and other symbols from a code file. Path is relative to project root.",
            &[path_param],
            &["path"],
        ),
        tool(
            "delete_file",
            "Delete a file. Path is relative to project root. Requires user confirmation.",
            &[path_param],
            &["path"],
        ),
        tool(
            "delete_directory",
            "Delete a directory and all its contents. Path is relative to project root. Requires user confirmation.",
            &[("path", "string", REL_DIR)],
            &["path"],
        ),
        tool(
            "move_file",
            "Move or rename a file. Paths are relative to project root. Requires user confirmation.",
            &[source_param, destination_param],
            &["source", "destination"],
        ),
        tool(
            "copy_file",
            "Copy a file to a new location. Paths are relative to project root. Creates destination directory if needed. Requires user confirmation.",
            &[source_param, destination_param],
            &["source", "destination"],
        ),
        tool(
            "find_files",
            "Find files by name pattern (glob pattern). Searches recursively from the given path (defaults to project root).",
            &[
                (
                    "pattern",
                    "string",
                    "File name pattern (glob, e.g., '*.go', 'test_*.php')",
                ),
                ("path", "string", SEARCH_FROM),
            ],
            &["pattern"],
        ),
        tool(
            "find_files_by_extension",
            "Find all files with a specific extension. Searches recursively from the given path (defaults to project root).",
            &[
                (
                    "extension",
                    "string",
                    "File extension (e.g., '.go', '.php', '.js') - include the dot",
                ),
                ("path", "string", SEARCH_FROM),
            ],
            &["extension"],
        ),
        tool(
            "search_symbols",
            "Search for a symbol (class, function, variable name) across the project. Returns all files where the symbol is defined or used.",
            &[
                ("symbol", "string", "Symbol name to search for"),
                ("path", "string", SEARCH_FROM),
            ],
            &["symbol"],
        ),
        tool(
            "get_project_stats",
            "Get project statistics: file count, lines of code, languages used, etc.",
            &[],
            &[],
        ),
        tool(
            "get_file_info",
            "Get detailed information about a file: size, modification time, permissions, line count, etc.",
            &[path_param],
            &["path"],
        ),
        tool(
            "find_dependencies",
            "Find and list project dependencies from package.json, go.mod, composer.json, requirements.txt, Cargo.toml, etc.",
            &[],
            &[],
        ),
        tool(
            "git_status",
            "Get git repository status. Returns modified, added, deleted, and untracked files. Works only if project is a git repository.",
            &[],
            &[],
        ),
        tool(
            "git_diff",
            "Get git diff for a file or directory. Returns changes made. Works only if project is a git repository.",
            &[(
                "path",
                "string",
                "Path to the file or directory relative to project root (empty string for entire repository)",
            )],
            &[],
        ),
        tool(
            "find_symbol_references",
            "Find all places where a symbol (class, function, variable) is used or referenced in the project. Searches code for occurrences of the symbol name.",
            &[
                ("symbol", "string", "Symbol name to search for"),
                ("path", "string", SEARCH_FROM),
            ],
            &["symbol"],
        ),
        tool(
            "execute",
            "Execute a shell command in the project root directory. Returns stdout, stderr, and exit code. Requires user confirmation.",
            &[
                ("command", "string", "Shell command to execute"),
                (
                    "description",
                    "string",
                    "Optional description of what this command does (for confirmation prompt)",
                ),
            ],
            &["command"],
        ),
    ]
}
