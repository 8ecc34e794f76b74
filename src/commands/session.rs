//! Interactive chat session (REPL).
//!
//! Reads a line at a time from the shared stdin, handles slash commands
//! locally and sends everything else through the orchestrator. Answers are
//! rendered as terminal markdown, streamed ones line by line as they arrive.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use crossterm::style::Stylize;

use crate::agent_core::types::{read_line, SharedInput};
use crate::agent_core::Orchestrator;
use crate::project::paths::{file_extension, language_for_extension, read_file, read_file_range};

use super::render::{render_answer, MarkdownStream};
use super::{
    explain_prompt, flush_stdout, parse_line_range, print_assistant_header,
    print_error, print_thinking,
};

// ─── Slash commands ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Exit,
    Clear,
    Help,
    File { path: Option<String> },
    Explain {
        path: Option<String>,
        range: Option<String>,
    },
}

impl SlashCommand {
    /// `None` for input that is not a known command; it goes to the model.
    fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let command = parts.next()?;
        let mut arg = || parts.next().map(str::to_string);
        match command {
            "/exit" | "/quit" | "/q" => Some(SlashCommand::Exit),
            "/clear" | "/reset" => Some(SlashCommand::Clear),
            "/help" | "/h" => Some(SlashCommand::Help),
            "/file" => Some(SlashCommand::File { path: arg() }),
            "/explain" => {
                let path = arg();
                let range = arg();
                Some(SlashCommand::Explain { path, range })
            }
            _ => None,
        }
    }
}

// ─── Session ────────────────────────────────────────────────────────────────

/// Settings shown in the welcome banner.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub root: PathBuf,
    pub base_url: String,
    pub model: String,
}

pub struct Session {
    orchestrator: Orchestrator,
    input: SharedInput,
    info: SessionInfo,
    stream: bool,
}

impl Session {
    pub fn new(orchestrator: Orchestrator, input: SharedInput, info: SessionInfo, stream: bool) -> Self {
        Self {
            orchestrator,
            input,
            info,
            stream,
        }
    }

    /// Run until `/exit` or end of input.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.print_welcome();

        loop {
            print!("\n{} ", "You:".cyan().bold());
            flush_stdout();

            let Some(line) = read_line(&self.input).context("error reading input")? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                if let Some(command) = SlashCommand::parse(input) {
                    if command == SlashCommand::Exit {
                        println!("\n{}", "Goodbye!".blue().bold());
                        break;
                    }
                    self.handle_command(command).await;
                    continue;
                }
            }

            self.converse(input).await;
        }

        Ok(())
    }

    async fn converse(&mut self, input: &str) {
        print_thinking();

        let (result, streamed) = if self.stream {
            let mut started = false;
            let mut markdown = MarkdownStream::new();
            let result = {
                let mut sink = |chunk: &str| -> std::io::Result<()> {
                    let mut out = std::io::stdout().lock();
                    if !started {
                        writeln!(out, "\n{}", "AXON:".magenta().bold())?;
                        started = true;
                    }
                    out.write_all(markdown.push(chunk).as_bytes())?;
                    out.flush()
                };
                self.orchestrator.submit_streaming(input, &mut sink).await
            };
            if started {
                print!("{}", markdown.finish());
            }
            (result, started)
        } else {
            (self.orchestrator.submit(input).await, false)
        };

        match result {
            Ok(answer) => {
                if !streamed && !answer.is_empty() {
                    print_assistant_header();
                    print!("{}", render_answer(&answer));
                }
                println!();
            }
            Err(e) => {
                tracing::debug!(error = %e, "turn failed");
                if e.partial_text().is_some() {
                    println!("\n{}", "(response interrupted, not kept in history)".yellow());
                }
                print_error("Error", e);
            }
        }
    }

    async fn handle_command(&mut self, command: SlashCommand) {
        match command {
            SlashCommand::Exit => {}
            SlashCommand::Clear => {
                self.orchestrator.reset();
                println!("\n{}", "Conversation history cleared.".green());
            }
            SlashCommand::Help => print_help(),
            SlashCommand::File { path: None } => {
                println!("\n{} /file <path>", "Usage:".red().bold());
            }
            SlashCommand::File { path: Some(path) } => self.show_file(&path),
            SlashCommand::Explain { path: None, .. } => {
                println!("\n{} /explain <path> [start:end]", "Usage:".red().bold());
            }
            SlashCommand::Explain {
                path: Some(path),
                range,
            } => self.explain(&path, range.as_deref()).await,
        }
    }

    fn show_file(&self, path: &str) {
        let file = match read_file(&self.info.root, path) {
            Ok(file) => file,
            Err(e) => return print_error("Error reading file", e),
        };
        let lang = language_for_extension(&file_extension(path));
        let note = if file.truncated { " (truncated to 200KB)" } else { "" };
        println!("\n{} {path}{note}", "File:".blue().bold());
        println!("```{lang}\n{}\n```", file.content);
    }

    async fn explain(&mut self, path: &str, range: Option<&str>) {
        let content = match range {
            Some(range) => {
                let Some((start, end)) = parse_line_range(range) else {
                    return print_error(
                        "Invalid range format",
                        format!("{range} (expected start:end)"),
                    );
                };
                read_file_range(&self.info.root, path, start, end)
            }
            None => read_file(&self.info.root, path).map(|file| {
                if file.truncated {
                    println!("\n{}", "File truncated to first 200KB".yellow());
                }
                file.content
            }),
        };
        let content = match content {
            Ok(content) => content,
            Err(e) => return print_error("Error reading file", e),
        };

        let lang = language_for_extension(&file_extension(path));
        let prompt = explain_prompt(path, "", lang, &content);

        print_thinking();
        match self.orchestrator.explain(&prompt).await {
            Ok(answer) => {
                println!("{}", "AXON:".magenta().bold());
                print!("{}", render_answer(&answer));
            }
            Err(e) => print_error("Error", e),
        }
    }

    fn print_welcome(&self) {
        let border = "═".repeat(60);
        println!("{}", format!("╔{border}╗").blue().bold());
        println!("{}", format!("║{:^60}║", "AXON - Code Assistant").blue().bold());
        println!("{}", format!("╚{border}╝").blue().bold());
        println!("\n{} {}", "Project root:".blue().bold(), self.info.root.display());
        println!("{} {}", "LLM server:".blue().bold(), self.info.base_url);
        println!("{} {}", "Model:".blue().bold(), self.info.model);
        println!(
            "\n{}",
            "Type your questions below. Use /help for commands.".yellow()
        );
        println!("   Press Ctrl+C or type /exit to quit.");
    }
}

fn print_help() {
    println!("\n{}", "Available commands:".blue().bold());
    println!("   /help, /h          - Show this help message");
    println!("   /clear, /reset     - Clear conversation history");
    println!("   /file <path>       - Display a file's contents");
    println!("   /explain <path>    - Explain code in a file");
    println!("   /explain <path> <start:end> - Explain a specific line range");
    println!("   /exit, /quit, /q   - Exit the chat");
    println!("\n{}", "You can also just type questions naturally!".yellow());
    println!("   Example: \"How do I implement rate limiting in Laravel?\"");
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::shared_input;
    use crate::agent_core::{ToolExecutor, PromptConfirmer};
    use crate::event_log;
    use crate::inference::InferenceClient;
    use crate::project::config::LlmConfig;
    use crate::tools::{all_tools, ToolContext};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(SlashCommand::parse("/q"), Some(SlashCommand::Exit));
        assert_eq!(SlashCommand::parse("/reset"), Some(SlashCommand::Clear));
        assert_eq!(SlashCommand::parse("/h"), Some(SlashCommand::Help));
        assert_eq!(
            SlashCommand::parse("/file src/main.go"),
            Some(SlashCommand::File {
                path: Some("src/main.go".into())
            })
        );
        assert_eq!(
            SlashCommand::parse("/explain a.go 3:9"),
            Some(SlashCommand::Explain {
                path: Some("a.go".into()),
                range: Some("3:9".into())
            })
        );
        assert_eq!(
            SlashCommand::parse("/explain"),
            Some(SlashCommand::Explain {
                path: None,
                range: None
            })
        );
        // Unknown commands are ordinary input.
        assert_eq!(SlashCommand::parse("/usr/bin is where?"), None);
    }

    async fn session_with(server: &MockServer, dir: &TempDir, script: &str, stream: bool) -> Session {
        let llm = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        let client = InferenceClient::from_config(&llm, event_log::noop()).unwrap();
        let input = shared_input(std::io::Cursor::new(script.to_string()));
        let ctx = ToolContext::new(dir.path(), vec![], None);
        let executor = ToolExecutor::new(
            ctx,
            Box::new(PromptConfirmer::with_output(input.clone(), Box::new(std::io::sink()))),
            event_log::noop(),
        );
        let orchestrator = Orchestrator::new(
            super::super::SYSTEM_PROMPT,
            Arc::new(client),
            Box::new(executor),
            all_tools(),
        );
        let info = SessionInfo {
            root: dir.path().to_path_buf(),
            base_url: server.uri(),
            model: llm.model.clone(),
        };
        Session::new(orchestrator, input, info, stream)
    }

    fn answer(text: &str) -> serde_json::Value {
        json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_session_chat_then_exit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("Hi there")))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let mut session = session_with(&server, &dir, "hello\n/exit\nnever read\n", false).await;
        session.run().await.unwrap();

        let messages = session.orchestrator.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text(), "hello");
        assert_eq!(messages[2].text(), "Hi there");
    }

    #[tokio::test]
    async fn test_session_clear_and_failed_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let mut session = session_with(&server, &dir, "hello\n/clear\n", false).await;
        session.run().await.unwrap();

        // Failed turn rolled back; only the system prompt remains.
        assert_eq!(session.orchestrator.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_session_explain_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("It prints.")))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.sh"), "echo one\necho two\necho three\n").unwrap();

        let mut session = session_with(&server, &dir, "/explain a.sh 2:3\n", false).await;
        session.run().await.unwrap();

        let messages = session.orchestrator.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[1].text().contains("```bash\necho two\necho three"));
        assert_eq!(messages[2].text(), "It prints.");
    }

    #[tokio::test]
    async fn test_session_explain_missing_file_leaves_history() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let mut session = session_with(&server, &dir, "/explain nope.go\n/file nope.go\n", false).await;
        session.run().await.unwrap();
        assert_eq!(session.orchestrator.messages().len(), 1);
    }
}
