//! Tool executor: routes model tool calls to the project tools.
//!
//! Read-only tools run straight away. Mutating tools are planned first; the
//! plan's description goes to a [`Confirmer`], and the effect happens only
//! once the user agrees (or a session grant is active). A declined call is a
//! normal result telling the model the user cancelled, not an error.
//!
//! Every call and its outcome is mirrored to the event log.

use std::io::Write;

use async_trait::async_trait;
use crossterm::style::Stylize;
use serde_json::Value;

use crate::event_log::{LogEvent, SharedLog, ToolOutcome};
use crate::tools::{self, kind_of, Mutation, ToolContext, ToolError, ToolKind};

use super::permissions::{PermissionStatus, PermissionStore};
use super::types::{read_line, ConfirmationRequest, ConfirmationResponse, SharedInput};

/// Result returned to the model when the user declines a mutating tool.
pub const CANCELLED_RESULT: &str =
    r#"{"cancelled": true, "message": "User cancelled the operation"}"#;

// ─── Seams ──────────────────────────────────────────────────────────────────

/// Executes one tool call on behalf of the conversation loop.
#[async_trait]
pub trait ToolDispatch: Send {
    /// Run `name` with decoded JSON `args`, returning the JSON result text.
    async fn dispatch(&mut self, name: &str, args: &Value) -> Result<String, ToolError>;

    /// Forget session-scoped state such as permission grants.
    fn reset_session(&mut self) {}
}

/// Asks the user whether a mutating tool may run.
///
/// Blocks until the user answers; there is no timeout.
pub trait Confirmer: Send {
    fn confirm(&mut self, request: &ConfirmationRequest) -> Result<ConfirmationResponse, ToolError>;
}

// ─── PromptConfirmer ────────────────────────────────────────────────────────

/// Terminal confirmation prompt reading from the shared stdin.
pub struct PromptConfirmer {
    input: SharedInput,
    output: Box<dyn Write + Send>,
}

impl PromptConfirmer {
    pub fn new(input: SharedInput) -> Self {
        Self::with_output(input, Box::new(std::io::stdout()))
    }

    pub fn with_output(input: SharedInput, output: Box<dyn Write + Send>) -> Self {
        Self { input, output }
    }

    fn render(&mut self, request: &ConfirmationRequest) -> std::io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", "⚠️  Confirmation required".yellow().bold())?;
        writeln!(self.output, "{} {}", "Action:".bold(), request.action)?;
        for line in request.description.lines() {
            writeln!(self.output, "  {line}")?;
        }
        write!(self.output, "{} ", "Proceed? [Y/n/a(lways)]:".cyan())?;
        self.output.flush()
    }
}

impl Confirmer for PromptConfirmer {
    fn confirm(&mut self, request: &ConfirmationRequest) -> Result<ConfirmationResponse, ToolError> {
        self.render(request).map_err(|e| ToolError::Confirmation {
            reason: e.to_string(),
        })?;

        match read_line(&self.input) {
            Ok(Some(line)) => Ok(ConfirmationResponse::parse(&line)),
            // Closed stdin cannot say yes.
            Ok(None) => Ok(ConfirmationResponse::Rejected),
            Err(e) => Err(ToolError::Confirmation {
                reason: e.to_string(),
            }),
        }
    }
}

// ─── ToolExecutor ───────────────────────────────────────────────────────────

pub struct ToolExecutor {
    ctx: ToolContext,
    confirmer: Box<dyn Confirmer>,
    /// Session grants from "always" answers.
    pub permissions: PermissionStore,
    log: SharedLog,
}

impl ToolExecutor {
    pub fn new(ctx: ToolContext, confirmer: Box<dyn Confirmer>, log: SharedLog) -> Self {
        Self {
            ctx,
            confirmer,
            permissions: PermissionStore::new(),
            log,
        }
    }

    async fn execute(&mut self, name: &str, args: &Value) -> Result<String, ToolError> {
        match kind_of(name) {
            Some(ToolKind::ReadOnly) => tools::run_read_only(&self.ctx, name, args).await,
            Some(ToolKind::Mutating) => {
                let mutation = tools::plan_mutation(&self.ctx, name, args)?;
                if !self.approve(name, &mutation)? {
                    tracing::info!(tool = name, "user declined tool call");
                    return Ok(CANCELLED_RESULT.to_string());
                }
                mutation.apply().await
            }
            None => Err(ToolError::UnknownTool {
                name: name.to_string(),
            }),
        }
    }

    /// Permission check, then the prompt.
    fn approve(&mut self, name: &str, mutation: &Mutation) -> Result<bool, ToolError> {
        if self.permissions.check(name) == PermissionStatus::Allowed {
            tracing::debug!(tool = name, "skipping confirmation, permission granted");
            return Ok(true);
        }

        let request = ConfirmationRequest {
            tool_name: name.to_string(),
            action: mutation.action.clone(),
            description: mutation.description.clone(),
        };
        let response = self.confirmer.confirm(&request)?;
        if response == ConfirmationResponse::ConfirmedForSession {
            self.permissions.grant(name);
        }
        Ok(response.is_confirmed())
    }
}

#[async_trait]
impl ToolDispatch for ToolExecutor {
    async fn dispatch(&mut self, name: &str, args: &Value) -> Result<String, ToolError> {
        let arguments = args.to_string();
        tracing::debug!(tool = name, arguments = %arguments, "executing tool");

        let result = self.execute(name, args).await;

        let failure;
        let outcome = match &result {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                failure = e.to_string();
                ToolOutcome::Failure(&failure)
            }
        };
        self.log.record(LogEvent::ToolCall {
            name,
            arguments: &arguments,
            outcome,
        });

        result
    }

    fn reset_session(&mut self) {
        self.permissions.clear_session();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
