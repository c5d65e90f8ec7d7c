//! Error taxonomy.
//!
//! Schema errors always happen before any backend call, validation errors
//! always after one. Nothing here is retried or repaired.
use thiserror::Error;

use crate::path::Path;

#[derive(Debug, Error)]
pub enum SopsError {
    /// No backend assigned, or backend settings are unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The query layer's own check on the unwrapped result failed.
    #[error("unexpected output shape: {0}")]
    Shape(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Malformed caller spec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at {path}")]
pub struct SchemaError {
    pub message: String,
    pub path: Path,
}

impl SchemaError {
    pub fn new(message: impl Into<String>, path: &Path) -> Self {
        Self { message: message.into(), path: path.clone() }
    }
}

/// Backend output that does not conform to the requested schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at {path}")]
pub struct ValidationError {
    pub message: String,
    pub path: Path,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, path: &Path) -> Self {
        Self { message: message.into(), path: path.clone() }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("missing API key: pass --api-key or set OPENAI_API_KEY")]
    MissingApiKey,

    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} request returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The provider answered, but the payload is not what was asked for.
    #[error("decode error: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

pub type Result<T, E = SopsError> = std::result::Result<T, E>;
