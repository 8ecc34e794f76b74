//! llama-server management.
//!
//! - `lifecycle`: spawn, readiness polling, output filtering, graceful stop
//! - `models`: model families and the interactive model menu
//! - `errors`: server error types

pub mod errors;
pub mod lifecycle;
pub mod models;

pub use errors::ServerError;
pub use lifecycle::{is_running, LlamaServer, Readiness};
pub use models::{select_model, ModelFamily, ModelSize, DEFAULT_MODEL, MODEL_FAMILIES};
