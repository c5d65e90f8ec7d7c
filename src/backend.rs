//! The generation collaborator.
//!
//! A backend only moves prompts and documents over the wire. It is never
//! trusted to honour the schema; `query::Session` re-validates every reply.
pub mod openai;

use serde_json::Value;

use crate::error::BackendError;

pub use openai::OpenAiBackend;

pub trait Backend: Send + Sync {
    /// Unconstrained text completion.
    fn infer_text(&self, prompt: &str) -> Result<String, BackendError>;

    /// Completion constrained by `document`, registered under `name`, parsed as JSON.
    fn infer_json(&self, prompt: &str, document: &Value, name: &str) -> Result<Value, BackendError>;
}
