//! Agent Core: the conversation loop and everything around tool execution.
//!
//! Submodules:
//! - `orchestrator`: Tool-calling conversation loop with history rollback
//! - `tool_router`: Routes model tool calls to the project tools, behind confirmation
//! - `permissions`: Session grants for mutating tools ("always" answers)
//! - `types`: Confirmation request/response and shared stdin
//! - `errors`: Agent-level error types

pub mod errors;
pub mod orchestrator;
pub mod permissions;
pub mod tool_router;
pub mod types;

// Re-exports for convenience
pub use errors::AgentError;
pub use orchestrator::{Orchestrator, MAX_TOOL_ROUNDS};
pub use permissions::PermissionStore;
pub use tool_router::{Confirmer, PromptConfirmer, ToolDispatch, ToolExecutor, CANCELLED_RESULT};
pub use types::{ConfirmationRequest, ConfirmationResponse, SharedInput};
