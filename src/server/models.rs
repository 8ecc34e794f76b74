//! Model families offered when no server is running.
//!
//! Selection is two steps: family, then size. On a terminal the menu is
//! driven with arrow keys or digits in raw mode; otherwise it falls back to a
//! numbered prompt read from the shared input.

use std::io::{IsTerminal, Write};

use crossterm::cursor;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal::{self, ClearType};
use crossterm::{execute, queue};

use crate::agent_core::types::{read_line, SharedInput};

use super::errors::ServerError;

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSize {
    pub name: &'static str,
    /// Hugging Face reference passed to `llama-server -hf`.
    pub model_id: &'static str,
    pub description: &'static str,
    /// Approximate download size.
    pub size: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelFamily {
    pub name: &'static str,
    pub description: &'static str,
    pub sizes: &'static [ModelSize],
    /// Size preselected in the menu.
    pub default_size: usize,
}

pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-Coder-3B-Instruct-GGUF:Q4_K_M";

const fn size(
    name: &'static str,
    model_id: &'static str,
    description: &'static str,
    size: &'static str,
) -> ModelSize {
    ModelSize {
        name,
        model_id,
        description,
        size,
    }
}

pub const MODEL_FAMILIES: &[ModelFamily] = &[
    ModelFamily {
        name: "Qwen2.5-Coder",
        description: "Alibaba's coding model, excellent for code generation and understanding",
        sizes: &[
            size("1.5B", "Qwen/Qwen2.5-Coder-1.5B-Instruct-GGUF:Q4_K_M", "Smallest, fastest", "~1GB"),
            size("3B", DEFAULT_MODEL, "Smaller, faster", "~2GB"),
            size("7B", "bartowski/Qwen2.5-Coder-7B-Instruct-GGUF:Q4_K_M", "Larger, better quality", "~4GB"),
            size("32B", "bartowski/Qwen2.5-Coder-32B-Instruct-GGUF:Q4_K_M", "Largest, best quality", "~18GB"),
        ],
        default_size: 1,
    },
    ModelFamily {
        name: "DeepSeek Coder",
        description: "DeepSeek's specialized coding model, great for complex code tasks",
        sizes: &[
            size("1.3B", "bartowski/DeepSeek-Coder-1.3B-Instruct-GGUF:Q4_K_M", "Smallest, fastest", "~1GB"),
            size("6.7B", "bartowski/DeepSeek-Coder-6.7B-Instruct-GGUF:Q4_K_M", "Good balance", "~4GB"),
            size("33B", "bartowski/DeepSeek-Coder-33B-Instruct-GGUF:Q4_K_M", "Largest, best quality", "~18GB"),
        ],
        default_size: 0,
    },
    ModelFamily {
        name: "CodeLlama",
        description: "Meta's coding model based on Llama, good general-purpose coding",
        sizes: &[
            size("7B", "bartowski/CodeLlama-7B-Instruct-GGUF:Q4_K_M", "Good balance", "~4GB"),
            size("13B", "bartowski/CodeLlama-13B-Instruct-GGUF:Q4_K_M", "Larger, better quality", "~7GB"),
            size("34B", "bartowski/CodeLlama-34B-Instruct-GGUF:Q4_K_M", "Largest, best quality", "~18GB"),
        ],
        default_size: 0,
    },
    ModelFamily {
        name: "StarCoder",
        description: "BigCode's StarCoder, trained on permissively licensed code",
        sizes: &[
            size("3B", "bartowski/starcoder2-3b-GGUF:Q4_K_M", "Smaller, faster", "~2GB"),
            size("7B", "bartowski/starcoder2-7b-GGUF:Q4_K_M", "Good balance", "~4GB"),
            size("15B", "bartowski/starcoder2-15b-GGUF:Q4_K_M", "Larger, better quality", "~8GB"),
        ],
        default_size: 0,
    },
];

// ─── Selection ───────────────────────────────────────────────────────────────

struct MenuItem {
    label: String,
    description: String,
}

/// Ask the user for a family and size; returns the model reference.
pub fn select_model(input: &SharedInput) -> Result<String, ServerError> {
    let families: Vec<MenuItem> = MODEL_FAMILIES
        .iter()
        .map(|f| MenuItem {
            label: f.name.to_string(),
            description: f.description.to_string(),
        })
        .collect();
    let family_index = choose(
        input,
        "No LLM server detected. Please select a model family:",
        &families,
        0,
    )?;
    let family = &MODEL_FAMILIES[family_index];

    let sizes: Vec<MenuItem> = family
        .sizes
        .iter()
        .map(|s| MenuItem {
            label: format!("{} ({}, {})", s.name, s.description, s.size),
            description: String::new(),
        })
        .collect();
    let title = format!("Selected: {} - Please select a size:", family.name);
    let size_index = choose(input, &title, &sizes, family.default_size)?;
    let chosen = &family.sizes[size_index];

    eprintln!();
    eprintln!("{}", format!("Selected: {} {}", family.name, chosen.name).green().bold());
    eprintln!();
    tracing::info!(model = chosen.model_id, "model selected");
    Ok(chosen.model_id.to_string())
}

fn choose(
    input: &SharedInput,
    title: &str,
    items: &[MenuItem],
    default: usize,
) -> Result<usize, ServerError> {
    if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
        match arrow_menu(title, items, default) {
            Ok(choice) => return choice,
            // Raw mode unavailable: fall back to the numbered prompt.
            Err(e) => tracing::debug!(error = %e, "interactive menu unavailable"),
        }
    }
    numbered_menu(input, title, items, default)
}

fn numbered_menu(
    input: &SharedInput,
    title: &str,
    items: &[MenuItem],
    default: usize,
) -> Result<usize, ServerError> {
    let rule = "═".repeat(60);
    eprintln!();
    eprintln!("{rule}");
    eprintln!("  {title}");
    eprintln!("{rule}");
    eprintln!();
    for (i, item) in items.iter().enumerate() {
        let mark = if i == default { " [default]" } else { "" };
        eprintln!("  {}) {}{mark}", i + 1, item.label);
        if !item.description.is_empty() {
            eprintln!("     {}", item.description);
        }
        eprintln!();
    }
    eprint!(
        "Enter your choice (1-{}, or Enter for default): ",
        items.len()
    );
    let _ = std::io::stderr().flush();

    let line = read_line(input)
        .map_err(|e| ServerError::Selection {
            reason: e.to_string(),
        })?
        .ok_or_else(|| ServerError::Selection {
            reason: "failed to read input".to_string(),
        })?;
    parse_choice(&line, items.len(), default)
}

/// Interpret a numbered answer; blank picks the default.
fn parse_choice(answer: &str, count: usize, default: usize) -> Result<usize, ServerError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(default);
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(ServerError::Selection {
            reason: format!("invalid choice: {answer}"),
        }),
    }
}

/// Restores the terminal when the menu exits, however it exits.
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(std::io::stderr(), cursor::Show);
    }
}

/// Arrow-key menu. The outer error means the terminal could not be driven.
fn arrow_menu(
    title: &str,
    items: &[MenuItem],
    default: usize,
) -> std::io::Result<Result<usize, ServerError>> {
    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard;
    let mut err = std::io::stderr();
    execute!(err, cursor::Hide)?;

    let mut selected = default.min(items.len().saturating_sub(1));
    loop {
        draw_menu(&mut err, title, items, selected)?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Up => {
                selected = if selected == 0 { items.len() - 1 } else { selected - 1 };
            }
            KeyCode::Down => {
                selected = if selected + 1 >= items.len() { 0 } else { selected + 1 };
            }
            KeyCode::Enter => {
                clear_screen(&mut err)?;
                return Ok(Ok(selected));
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(Err(ServerError::Selection {
                    reason: "interrupted by user".to_string(),
                }));
            }
            KeyCode::Char(c) => {
                if let Some(n) = c.to_digit(10) {
                    let n = n as usize;
                    if (1..=items.len()).contains(&n) {
                        clear_screen(&mut err)?;
                        return Ok(Ok(n - 1));
                    }
                }
            }
            _ => {}
        }
    }
}

fn clear_screen(out: &mut impl Write) -> std::io::Result<()> {
    execute!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))
}

fn draw_menu(
    out: &mut impl Write,
    title: &str,
    items: &[MenuItem],
    selected: usize,
) -> std::io::Result<()> {
    let rule = "═".repeat(60);
    queue!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    // Raw mode: lines need an explicit carriage return.
    write!(out, "{rule}\r\n  {title}\r\n{rule}\r\n\r\n")?;
    write!(
        out,
        "{}\r\n\r\n",
        "Use ↑↓ arrows or numbers to select, Enter to confirm".yellow()
    )?;
    for (i, item) in items.iter().enumerate() {
        if i == selected {
            write!(out, "{}\r\n", format!("  ▶ {}", item.label).reverse().bold())?;
            if !item.description.is_empty() {
                write!(out, "{}\r\n", format!("     {}", item.description).reverse())?;
            }
        } else {
            write!(out, "     {}\r\n", item.label)?;
            if !item.description.is_empty() {
                write!(out, "     {}\r\n", item.description)?;
            }
        }
        write!(out, "\r\n")?;
    }
    out.flush()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
