//! Line-oriented regex symbol extraction.
//!
//! Each language is a small table of rules applied to every line in order.
//! These are heuristics for navigation, not parsers: multi-line signatures,
//! macros and nested definitions are caught only when a single line says
//! enough.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;

/// A named definition found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    /// `function`, `method`, `class`, `struct`, `interface` or `impl`.
    #[serde(rename = "type")]
    pub kind: String,
    /// 1-based line number.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Symbol {
    pub fn is_class_like(&self) -> bool {
        matches!(self.kind.as_str(), "class" | "interface" | "struct")
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self.kind.as_str(), "function" | "method")
    }
}

/// Languages with a symbol grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Php,
    JavaScript,
    CFamily,
    Lua,
    Python,
    Java,
    Ruby,
    Rust,
    Shell,
}

impl Language {
    /// Grammar for a lowercased extension with its dot.
    ///
    /// TypeScript shares the JavaScript grammar.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let language = match ext {
            ".go" => Language::Go,
            ".php" => Language::Php,
            ".js" | ".jsx" | ".ts" | ".tsx" => Language::JavaScript,
            ".c" | ".cpp" | ".cc" | ".cxx" | ".h" | ".hpp" => Language::CFamily,
            ".lua" => Language::Lua,
            ".py" => Language::Python,
            ".java" => Language::Java,
            ".rb" => Language::Ruby,
            ".rs" => Language::Rust,
            ".sh" | ".bash" | ".zsh" => Language::Shell,
            _ => return None,
        };
        Some(language)
    }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

enum KindSource {
    Fixed(&'static str),
    /// The symbol kind is the text of this capture group.
    Group(usize),
}

struct Rule {
    pattern: Regex,
    kind: KindSource,
    name_group: usize,
    skip_if_line_contains: Option<&'static str>,
}

impl Rule {
    fn new(pattern: &str, kind: &'static str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind: KindSource::Fixed(kind),
            name_group: 1,
            skip_if_line_contains: None,
        })
    }

    fn name_group(mut self, group: usize) -> Self {
        self.name_group = group;
        self
    }

    fn kind_from_group(mut self, group: usize) -> Self {
        self.kind = KindSource::Group(group);
        self
    }

    fn unless_line_contains(mut self, needle: &'static str) -> Self {
        self.skip_if_line_contains = Some(needle);
        self
    }

    fn apply(&self, line: &str, line_number: usize) -> Option<Symbol> {
        if let Some(needle) = self.skip_if_line_contains {
            if line.contains(needle) {
                return None;
            }
        }
        let caps = self.pattern.captures(line)?;
        let name = caps.get(self.name_group)?.as_str().to_string();
        let kind = match self.kind {
            KindSource::Fixed(kind) => kind.to_string(),
            KindSource::Group(group) => caps.get(group)?.as_str().to_string(),
        };
        Some(Symbol {
            name,
            kind,
            line: line_number,
            signature: None,
        })
    }
}

struct Grammar {
    rules: Vec<Rule>,
    /// Stop at the first rule that matches a line.
    first_match_only: bool,
    /// Lines starting with this prefix (after trimming) are skipped.
    comment_prefix: Option<&'static str>,
}

impl Grammar {
    fn all(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            first_match_only: false,
            comment_prefix: None,
        }
    }
}

// ─── SymbolParser ────────────────────────────────────────────────────────────

/// Compiled grammars for every supported language.
pub struct SymbolParser {
    grammars: HashMap<Language, Grammar>,
}

impl SymbolParser {
    pub fn new() -> Result<Self, regex::Error> {
        const IDENT: &str = "[A-Za-z_][A-Za-z0-9_]*";
        const JS_IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

        let mut grammars = HashMap::new();

        grammars.insert(
            Language::Go,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*func\s+(\([^)]+\)\s+)?({IDENT})"), "function")?
                    .name_group(2),
                Rule::new(&format!(r"^\s*type\s+({IDENT})\s+(struct|interface)"), "struct")?
                    .kind_from_group(2),
            ]),
        );

        grammars.insert(
            Language::Php,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*(?:abstract\s+|final\s+)?class\s+({IDENT})"), "class")?,
                Rule::new(
                    &format!(r"^\s*(?:public|private|protected|static|\s)*\s*function\s+({IDENT})"),
                    "function",
                )?,
            ]),
        );

        grammars.insert(
            Language::JavaScript,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*(?:export\s+)?class\s+({JS_IDENT})"), "class")?,
                Rule::new(
                    &format!(r"^\s*(?:export\s+)?(?:async\s+)?function\s+({JS_IDENT})"),
                    "function",
                )?,
                Rule::new(
                    &format!(
                        r"^\s*(?:export\s+)?(?:const|let|var)\s+({JS_IDENT})\s*=\s*(?:async\s*)?\("
                    ),
                    "function",
                )?,
            ]),
        );

        grammars.insert(
            Language::CFamily,
            Grammar::all(vec![
                Rule::new(
                    &format!(r"^\s*(?:static\s+|inline\s+)?(?:{IDENT}\s+)+({IDENT})\s*\("),
                    "function",
                )?,
                Rule::new(&format!(r"^\s*struct\s+({IDENT})"), "struct")?,
                Rule::new(&format!(r"^\s*class\s+({IDENT})"), "class")?,
            ]),
        );

        let lua_name = format!(r"{IDENT}(?:\.{IDENT})*");
        grammars.insert(
            Language::Lua,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*(?:local\s+)?function\s+({lua_name})"), "function")?,
                Rule::new(
                    &format!(r"^\s*(?:local\s+)?({lua_name})\s*=\s*function\s*\("),
                    "function",
                )?,
            ]),
        );

        grammars.insert(
            Language::Python,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*class\s+({IDENT})"), "class")?,
                Rule::new(&format!(r"^\s*def\s+({IDENT})"), "function")?,
            ]),
        );

        grammars.insert(
            Language::Java,
            Grammar::all(vec![
                Rule::new(
                    &format!(r"^\s*(?:public|private|protected|abstract|final|\s)*\s*class\s+({IDENT})"),
                    "class",
                )?,
                Rule::new(
                    &format!(
                        r"^\s*(?:public|private|protected|static|abstract|\s)*\s*(?:[A-Za-z_][A-Za-z0-9_.]*\s+)?({IDENT})\s*\("
                    ),
                    "method",
                )?
                .unless_line_contains("class"),
            ]),
        );

        grammars.insert(
            Language::Ruby,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*class\s+({IDENT}(?:::{IDENT})*)"), "class")?,
                Rule::new(&format!(r"^\s*def\s+(?:self\.)?({IDENT})"), "function")?,
            ]),
        );

        grammars.insert(
            Language::Rust,
            Grammar::all(vec![
                Rule::new(&format!(r"^\s*(?:pub\s+)?struct\s+({IDENT})"), "struct")?,
                Rule::new(&format!(r"^\s*impl\s+(?:{IDENT}::)?({IDENT})"), "impl")?,
                Rule::new(&format!(r"^\s*(?:pub\s+)?fn\s+({IDENT})"), "function")?,
            ]),
        );

        grammars.insert(
            Language::Shell,
            Grammar {
                rules: vec![
                    Rule::new(&format!(r"^\s*function\s+({IDENT})"), "function")?,
                    Rule::new(&format!(r"^\s*({IDENT})\s*\(\)\s*\{{?"), "function")?,
                ],
                first_match_only: true,
                comment_prefix: Some("#"),
            },
        );

        Ok(Self { grammars })
    }

    /// Symbols in `content`, which has extension `ext`.
    ///
    /// Unsupported extensions yield no symbols.
    pub fn parse(&self, ext: &str, content: &str) -> Vec<Symbol> {
        let grammar = match Language::from_extension(ext).and_then(|l| self.grammars.get(&l)) {
            Some(grammar) => grammar,
            None => return Vec::new(),
        };

        let mut symbols = Vec::new();
        for (offset, line) in content.lines().enumerate() {
            if let Some(prefix) = grammar.comment_prefix {
                if line.trim_start().starts_with(prefix) {
                    continue;
                }
            }
            for rule in &grammar.rules {
                if let Some(symbol) = rule.apply(line, offset + 1) {
                    symbols.push(symbol);
                    if grammar.first_match_only {
                        break;
                    }
                }
            }
        }
        symbols
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn names(symbols: &[Symbol]) -> Vec<(String, String, usize)> {
        symbols
            .iter()
            .map(|s| (s.name.clone(), s.kind.clone(), s.line))
            .collect()
    }

    fn parse(ext: &str, content: &str) -> Vec<(String, String, usize)> {
        let parser = SymbolParser::new().unwrap();
        names(&parser.parse(ext, content))
    }

    fn entry(name: &str, kind: &str, line: usize) -> (String, String, usize) {
        (name.to_string(), kind.to_string(), line)
    }

    #[test]
    fn test_go_functions_methods_and_types() {
        let src = "package x\n\nfunc Load() {}\nfunc (s *Server) Start() error {\ntype Config struct {\ntype Store interface {\n";
        assert_eq!(
            parse(".go", src),
            vec![
                entry("Load", "function", 3),
                entry("Start", "function", 4),
                entry("Config", "struct", 5),
                entry("Store", "interface", 6),
            ]
        );
    }

    #[test]
    fn test_php_class_and_methods() {
        let src = "<?php\nfinal class UserController {\n    public static function index() {\n";
        assert_eq!(
            parse(".php", src),
            vec![entry("UserController", "class", 2), entry("index", "function", 3)]
        );
    }

    #[test]
    fn test_typescript_uses_javascript_rules() {
        let src = "export class Api {}\nexport async function load() {}\nconst handler = async (req) => {}\n";
        assert_eq!(
            parse(".tsx", src),
            vec![
                entry("Api", "class", 1),
                entry("load", "function", 2),
                entry("handler", "function", 3),
            ]
        );
    }

    #[test]
    fn test_c_functions_and_structs() {
        let src = "static int parse_args(int argc) {\nstruct node {\n";
        assert_eq!(
            parse(".c", src),
            vec![entry("parse_args", "function", 1), entry("node", "struct", 2)]
        );
    }

    #[test]
    fn test_lua_dotted_names() {
        let src = "function M.setup(opts)\nlocal helper = function(x)\n";
        assert_eq!(
            parse(".lua", src),
            vec![entry("M.setup", "function", 1), entry("helper", "function", 2)]
        );
    }

    #[test]
    fn test_python_class_and_def() {
        let src = "class Repo:\n    def save(self):\n";
        assert_eq!(
            parse(".py", src),
            vec![entry("Repo", "class", 1), entry("save", "function", 2)]
        );
    }

    #[test]
    fn test_java_method_skips_class_lines() {
        let src = "public class Main {\n    public static void run(String[] args) {\n";
        assert_eq!(
            parse(".java", src),
            vec![entry("Main", "class", 1), entry("run", "method", 2)]
        );
    }

    #[test]
    fn test_ruby_namespaced_class_and_self_method() {
        let src = "class Admin::User\n  def self.find(id)\n";
        assert_eq!(
            parse(".rb", src),
            vec![entry("Admin::User", "class", 1), entry("find", "function", 2)]
        );
    }

    #[test]
    fn test_rust_struct_impl_fn() {
        let src = "pub struct Index {\nimpl Index {\n    pub fn build() {}\n";
        assert_eq!(
            parse(".rs", src),
            vec![
                entry("Index", "struct", 1),
                entry("Index", "impl", 2),
                entry("build", "function", 3),
            ]
        );
    }

    #[test]
    fn test_shell_functions_skip_comments() {
        let src = "# deploy() {\nfunction build {\ndeploy() {\n";
        assert_eq!(
            parse(".sh", src),
            vec![entry("build", "function", 2), entry("deploy", "function", 3)]
        );
    }

    #[test]
    fn test_unknown_extension_has_no_symbols() {
        assert!(parse(".txt", "def nothing():").is_empty());
    }

    #[test]
    fn test_symbol_classification() {
        let parser = SymbolParser::new().unwrap();
        let symbols = parser.parse(".go", "type A struct {\nfunc b() {}\n");
        assert!(symbols[0].is_class_like());
        assert!(symbols[1].is_function_like());
    }
}
