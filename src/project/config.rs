//! Configuration loading for `.axon.yml` / `.axon.yaml`.
//!
//! Reads the project config file, performs environment-variable
//! interpolation, and applies `AXON_*` environment overrides on top.

use std::path::Path;

use serde::Deserialize;

use super::errors::ProjectError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Config file names, in lookup order.
pub const CONFIG_FILE_NAMES: [&str; 2] = [".axon.yml", ".axon.yaml"];

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_MODEL: &str = "qwen2.5-coder-3b";
const DEFAULT_TEMPERATURE: f32 = 0.15;
const DEFAULT_SERVER_MODEL: &str = "Qwen/Qwen2.5-Coder-3B-Instruct-GGUF:Q4_K_M";
const DEFAULT_IGNORE: [&str; 4] = ["vendor/", "node_modules/", "storage/", ".git/"];

// ─── Config Types ────────────────────────────────────────────────────────────

/// Top-level Axon configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub context: ContextConfig,
}

/// Model endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Omitted from requests when unset.
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// llama-server process settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub auto_start: bool,
    /// Empty means `llama-server` from `PATH`.
    pub server_path: String,
    /// Hugging Face model reference passed to `-hf`.
    pub model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            server_path: String::new(),
            model: DEFAULT_SERVER_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub ignore: Vec<String>,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

impl Config {
    /// Load the config for `root` using the process environment.
    pub fn load(root: &Path) -> Result<Self, ProjectError> {
        Self::load_with(root, &|key| std::env::var(key).ok())
    }

    /// Load the config for `root`, reading variables through `lookup`.
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load_with(
        root: &Path,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ProjectError> {
        let mut config = Config::default();

        for name in CONFIG_FILE_NAMES {
            let path = root.join(name);
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            config = Self::parse(&raw, lookup).map_err(|reason| ProjectError::Config {
                file: name.to_string(),
                reason,
            })?;
            tracing::debug!(file = %path.display(), "loaded config file");
            break;
        }

        config.apply_env_overrides(lookup);
        config.apply_defaults();
        Ok(config)
    }

    fn parse(raw: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, String> {
        let interpolated = interpolate_env_vars(raw, lookup);
        if interpolated.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&interpolated).map_err(|e| e.to_string())
    }

    /// Apply `AXON_*` overrides. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(base_url) = var("AXON_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(model) = var("AXON_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(temperature) = var("AXON_LLM_TEMPERATURE") {
            match temperature.trim().parse::<f32>() {
                Ok(t) => self.llm.temperature = t,
                Err(_) => tracing::warn!(value = %temperature, "ignoring invalid AXON_LLM_TEMPERATURE"),
            }
        }
        if let Some(auto_start) = var("AXON_SERVER_AUTO_START") {
            self.server.auto_start = auto_start == "1" || auto_start == "true";
        }
        if let Some(server_path) = var("AXON_SERVER_PATH") {
            self.server.server_path = server_path;
        }
        if let Some(model) = var("AXON_SERVER_MODEL") {
            self.server.model = model;
        }
    }

    fn apply_defaults(&mut self) {
        if self.context.ignore.is_empty() {
            self.context.ignore = DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect();
        }
    }
}

// ─── Interpolation ───────────────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` with values from `lookup`.
pub(crate) fn interpolate_env_vars(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr, lookup));
        } else {
            result.push(ch);
        }
    }

    result
}

fn resolve_var_expr(expr: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => lookup(name).unwrap_or_else(|| expand_tilde(default)),
        None => lookup(expr).unwrap_or_default(),
    }
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
