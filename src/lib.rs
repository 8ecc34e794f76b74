pub mod agent_core;
pub mod commands;
pub mod event_log;
pub mod indexer;
pub mod inference;
pub mod project;
pub mod server;
pub mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;

use agent_core::{Orchestrator, PromptConfirmer, SharedInput, ToolExecutor};
use commands::session::{Session, SessionInfo};
use event_log::{SharedLog, TracingLog};
use indexer::ProjectIndex;
use inference::InferenceClient;
use project::Config;
use server::LlamaServer;
use tools::ToolContext;

/// Async mutex for the server handle shared with the Ctrl+C watcher.
pub type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Name of the debug log written in the project root.
const DEBUG_LOG_FILE: &str = ".axon-debug.log";

// ─── CLI ────────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = "\
COMMANDS IN CHAT:
    /help, /h                    Show available commands
    /clear, /reset               Clear conversation history
    /file <path>                 Display a file's contents
    /explain <path>              Explain code in a file
    /explain <path> <start:end>  Explain a specific line range
    /exit, /quit, /q             Exit the chat

CONFIGURATION:
    .axon.yml or .axon.yaml in the project root, overridden by
    AXON_LLM_BASE_URL, AXON_LLM_MODEL, AXON_LLM_TEMPERATURE,
    AXON_SERVER_AUTO_START, AXON_SERVER_PATH and AXON_SERVER_MODEL.

DEBUG:
    AXON_DEBUG=1 enables debug output on stderr.
    AXON_DEBUG_LOG=1 writes a full log to .axon-debug.log in the project root.";

/// Interactive code assistant powered by a local LLM.
#[derive(Debug, Parser)]
#[command(name = "axon", version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Project root; skips discovery from the current directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Wait for complete answers instead of streaming them
    #[arg(long, global = true)]
    pub no_stream: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a single question
    Ask {
        question: String,
        /// Include this file in the question
        #[arg(long)]
        file: Option<String>,
    },
    /// Explain a file or a line range (start:end)
    Explain { path: String, range: Option<String> },
    /// Search the project, optionally asking the model to analyze the matches
    Search {
        pattern: String,
        path: Option<String>,
        #[arg(long)]
        explain: bool,
    },
}

// ─── Tracing ────────────────────────────────────────────────────────────────

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).as_deref().map(str::trim),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("True")
    )
}

/// Initialize tracing: stderr always, plus `.axon-debug.log` when
/// `AXON_DEBUG_LOG` is set.
///
/// Returns whether the debug log file is active.
fn init_tracing(root: &Path, debug: bool) -> bool {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter, Layer};

    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            "axon=debug,axon::event_log=info"
        } else {
            "axon=error"
        })
    });
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let log_path = root.join(DEBUG_LOG_FILE);
    let file_writer = if env_flag("AXON_DEBUG_LOG") {
        match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => Some(FlushingWriter::new(file)),
            Err(e) => {
                eprintln!("Warning: failed to open {}: {e}", log_path.display());
                None
            }
        }
    } else {
        None
    };
    let file_enabled = file_writer.is_some();
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_filter(EnvFilter::new("axon=debug"))
    });

    if tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        return false;
    }

    if file_enabled {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            root = %root.display(),
            log_file = %log_path.display(),
            pid = std::process::id(),
            "=== axon starting ==="
        );
    }
    file_enabled
}

/// A writer that wraps `std::fs::File` and flushes after every write.
///
/// Log lines reach the disk even when the process is killed.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self.file.lock().map_err(|e| {
            std::io::Error::other(format!("lock poisoned: {e}"))
        })?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self.file.lock().map_err(|e| {
            std::io::Error::other(format!("lock poisoned: {e}"))
        })?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Startup ────────────────────────────────────────────────────────────────

fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("project root does not exist: {}", root.display())),
        None => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            project::find_project_root(&cwd).context("failed to find project root")
        }
    }
}

/// Make sure a model server answers at the configured URL.
///
/// A server we start is placed in `slot` as soon as its process exists, so
/// an interrupt during the readiness wait can still stop it. With `input`
/// the user picks the model from a menu; without it the configured model is
/// used.
async fn prepare_server(
    config: &Config,
    debug: bool,
    input: Option<&SharedInput>,
    slot: &TokioMutex<Option<LlamaServer>>,
) -> anyhow::Result<()> {
    let base_url = &config.llm.base_url;
    if server::is_running(base_url).await {
        let note = format!("LLM server is already running at {base_url}");
        eprintln!("{}", note.green().bold());
        return Ok(());
    }

    if !config.server.auto_start {
        eprintln!(
            "{}",
            "LLM server is not running and auto-start is disabled.".yellow().bold()
        );
        eprintln!("   Please start llama-server manually or enable auto-start in config.");
        anyhow::bail!("no LLM server at {base_url}");
    }

    let model = match input {
        Some(input) => server::select_model(input).context("error selecting model")?,
        None => config.server.model.clone(),
    };

    let llama = LlamaServer::new(&config.server.server_path, base_url, &model, debug);
    if let Err(e) = start_server(slot, llama).await {
        eprintln!(
            "{} You can disable auto-start by setting AXON_SERVER_AUTO_START=0",
            "Tip:".yellow()
        );
        eprintln!("   or configure a manual server path in .axon.yml");
        return Err(e).context("error starting LLM server");
    }
    Ok(())
}

/// Spawn `llama`, publish it in `slot`, then wait for it to answer.
///
/// The lock is not held while waiting. A server that never becomes ready is
/// stopped again.
async fn start_server(
    slot: &TokioMutex<Option<LlamaServer>>,
    mut llama: LlamaServer,
) -> Result<(), server::ServerError> {
    let readiness = llama.spawn()?;
    *slot.lock().await = Some(llama);

    if let Err(e) = readiness.wait().await {
        stop_server(slot).await;
        return Err(e);
    }
    Ok(())
}

/// Stop the server and exit on Ctrl+C.
fn spawn_interrupt_handler(server: Arc<TokioMutex<Option<LlamaServer>>>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        if let Some(mut llama) = server.lock().await.take() {
            if let Err(e) = llama.stop().await {
                tracing::warn!(error = %e, "failed to stop server on interrupt");
            }
        }
        std::process::exit(0);
    });
}

async fn stop_server(server: &TokioMutex<Option<LlamaServer>>) {
    if let Some(mut llama) = server.lock().await.take() {
        if let Err(e) = llama.stop().await {
            tracing::warn!(error = %e, "failed to stop server");
        }
    }
}

fn build_index(root: &Path, ignore: &[String]) -> Option<Arc<ProjectIndex>> {
    match ProjectIndex::build(root, ignore) {
        Ok(index) => {
            tracing::info!(files = index.len(), "project indexed");
            Some(Arc::new(index))
        }
        Err(e) => {
            tracing::warn!(error = %e, "project indexing failed, index tools disabled");
            None
        }
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let debug = cli.debug || env_flag("AXON_DEBUG");

    let root = resolve_root(cli.root.as_deref())?;
    let debug_log = init_tracing(&root, debug);

    let config = Config::load(&root).context("failed to load config")?;
    tracing::debug!(root = %root.display(), base_url = %config.llm.base_url, "loaded config");

    let log: SharedLog = if debug || debug_log {
        Arc::new(TracingLog)
    } else {
        event_log::noop()
    };
    let client = Arc::new(
        InferenceClient::from_config(&config.llm, log.clone()).context("failed to create LLM client")?,
    );

    let input = agent_core::types::stdin_input();
    let interactive = cli.command.is_none();
    let server = Arc::new(TokioMutex::new(None));
    spawn_interrupt_handler(server.clone());

    prepare_server(&config, debug, interactive.then_some(&input), &server).await?;

    let result = match cli.command {
        Some(Command::Ask { question, file }) => {
            commands::oneshot::ask(client.as_ref(), &root, &question, file.as_deref())
                .await
                .map(|answer| println!("{answer}"))
        }
        Some(Command::Explain { path, range }) => {
            commands::oneshot::explain(client.as_ref(), &root, &path, range.as_deref())
                .await
                .map(|answer| println!("{answer}"))
        }
        Some(Command::Search {
            pattern,
            path,
            explain,
        }) => {
            commands::oneshot::search(client.as_ref(), &root, &pattern, path.as_deref(), explain)
                .await
        }
        None => {
            let ignore = config.context.ignore.clone();
            let index = build_index(&root, &ignore);
            let ctx = ToolContext::new(&root, ignore, index);
            let executor = ToolExecutor::new(
                ctx,
                Box::new(PromptConfirmer::new(input.clone())),
                log.clone(),
            );
            let orchestrator = Orchestrator::new(
                commands::SYSTEM_PROMPT,
                client.clone(),
                Box::new(executor),
                tools::all_tools(),
            );
            let info = SessionInfo {
                root: root.clone(),
                base_url: config.llm.base_url.clone(),
                model: config.llm.model.clone(),
            };
            Session::new(orchestrator, input, info, !cli.no_stream)
                .run()
                .await
        }
    };

    stop_server(&server).await;
    result
}
