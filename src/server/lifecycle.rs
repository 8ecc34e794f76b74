//! llama-server process lifecycle.
//!
//! Spawns `llama-server -hf <model> --jinja`, echoes its output while it
//! loads (filtering the per-request chatter), polls `/v1/models` until the
//! server answers, and stops it with SIGTERM followed by a kill after a grace
//! period.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use super::errors::ServerError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Binary used when no explicit server path is configured.
pub const DEFAULT_SERVER_BINARY: &str = "llama-server";

/// Overall startup deadline. First runs download the model, so this is long.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Interval between readiness checks.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How often a "still waiting" line is printed during startup.
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Timeout for a single readiness check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Grace period between SIGTERM and a forced kill.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server log lines hidden from the user unless debugging.
const NOISY_PATTERNS: &[&str] = &[
    "slot update_slots",
    "slot launch_slot_",
    "slot get_availabl",
    "params_from_",
    "chat format:",
    "sampler chain:",
    "processing task",
    "prompt processing progress",
    "n_tokens =",
    "memory_seq_rm",
    "batch.n_tokens",
];

// ─── Readiness ───────────────────────────────────────────────────────────────

/// True when something answers `GET {base_url}/v1/models` with a status
/// below 500 within the check timeout.
pub async fn is_running(base_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(CHECK_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    let url = format!("{}/v1/models", base_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) => response.status().as_u16() < 500,
        Err(_) => false,
    }
}

async fn wait_for_ready(
    base_url: &str,
    deadline: Duration,
    poll: Duration,
) -> Result<(), ServerError> {
    let started = Instant::now();
    let mut last_status = started;

    loop {
        if started.elapsed() >= deadline {
            eprintln!();
            return Err(ServerError::NotReady {
                waited: format_elapsed(started.elapsed()),
            });
        }

        tokio::time::sleep(poll).await;

        if last_status.elapsed() >= STATUS_INTERVAL {
            let line = format!("[Still waiting... {} elapsed]", format_elapsed(started.elapsed()));
            eprintln!("{}", line.yellow());
            last_status = Instant::now();
        }

        if is_running(base_url).await {
            eprintln!();
            return Ok(());
        }
    }
}

/// Whole seconds as `1m4s` / `12s`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Whether a server log line is worth showing.
fn should_show_output(line: &str, debug: bool) -> bool {
    if debug {
        return true;
    }
    let lower = line.to_lowercase();
    !NOISY_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Echo server output to stderr until it is ready, then only to the log.
async fn forward_output<R>(stream: R, debug: bool, ready: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if ready.load(Ordering::Relaxed) {
            tracing::debug!(target: "axon::server::output", "{line}");
        } else if should_show_output(&line, debug) {
            eprintln!("{line}");
        }
    }
}

// ─── LlamaServer ─────────────────────────────────────────────────────────────

/// A llama-server child process started by us.
pub struct LlamaServer {
    program: String,
    args: Vec<String>,
    base_url: String,
    debug: bool,
    child: Option<Child>,
    ready: Arc<AtomicBool>,
}

impl LlamaServer {
    /// `server_path` may be empty to use `llama-server` from PATH.
    pub fn new(server_path: &str, base_url: &str, model: &str, debug: bool) -> Self {
        let program = if server_path.is_empty() {
            DEFAULT_SERVER_BINARY.to_string()
        } else {
            server_path.to_string()
        };
        Self {
            program,
            // --jinja enables the chat template's tool-calling support.
            args: vec!["-hf".to_string(), model.to_string(), "--jinja".to_string()],
            base_url: base_url.to_string(),
            debug,
            child: None,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the server process.
    ///
    /// The process runs from here on, but the server only answers requests
    /// once the returned [`Readiness`] resolves.
    pub fn spawn(&mut self) -> Result<Readiness, ServerError> {
        eprintln!("{}", "Starting llama-server...".blue().bold());
        eprintln!(
            "{}",
            "Note: If this is the first time using this model, it will be downloaded.".yellow()
        );
        eprintln!(
            "{}",
            "This may take several minutes depending on model size and internet speed.".yellow()
        );
        eprintln!();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServerError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(program = %self.program, args = ?self.args, pid = ?child.id(), "spawned llama-server");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, self.debug, self.ready.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, self.debug, self.ready.clone()));
        }
        self.child = Some(child);

        Ok(Readiness {
            base_url: self.base_url.clone(),
            ready: self.ready.clone(),
        })
    }

    /// Stop the child: SIGTERM, then kill if it outlives the grace period.
    ///
    /// A no-op when we never started a process.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        eprintln!();
        eprintln!("{}", "Stopping llama-server...".yellow().bold());

        if let Err(reason) = terminate(&mut child) {
            tracing::debug!(%reason, "graceful stop signal failed, killing");
            child.kill().await.map_err(|e| ServerError::StopFailed {
                reason: e.to_string(),
            })?;
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(_) => {
                eprintln!("{}", "llama-server stopped".green().bold());
            }
            Err(_) => {
                child.kill().await.map_err(|e| ServerError::StopFailed {
                    reason: e.to_string(),
                })?;
                eprintln!("{}", "llama-server force stopped".green().bold());
            }
        }
        Ok(())
    }
}

/// Pending startup of a spawned server.
///
/// Holds no reference to the process, so the [`LlamaServer`] can be handed
/// to a shutdown path while this is awaited.
pub struct Readiness {
    base_url: String,
    ready: Arc<AtomicBool>,
}

impl Readiness {
    /// Poll until the server answers or the startup deadline passes.
    ///
    /// Server output stops being echoed once it is ready.
    pub async fn wait(self) -> Result<(), ServerError> {
        eprintln!("{}", "Waiting for server to be ready...".yellow());
        eprintln!("{}", "(This may take a while if downloading the model)".yellow());
        eprintln!();

        wait_for_ready(&self.base_url, STARTUP_TIMEOUT, POLL_INTERVAL).await?;

        self.ready.store(true, Ordering::Relaxed);
        let note = format!("LLM server is ready at {}", self.base_url);
        eprintln!("{}", note.green().bold());
        Ok(())
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> Result<(), String> {
    let pid = child.id().ok_or_else(|| "process already exited".to_string())?;
    let pid = libc::pid_t::try_from(pid).map_err(|e| e.to_string())?;
    // SAFETY: plain signal delivery to a pid we spawned and still own.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error().to_string())
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<(), String> {
    child.start_kill().map_err(|e| e.to_string())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
