//! Query surface: compile → call backend → validate.
//!
//! A `Session` is built once and passed to every call. There is no ambient
//! backend; a session without one refuses to make any request.
use std::sync::Arc;

use serde_json::Value;

use crate::backend::Backend;
use crate::compile::CompiledSchema;
use crate::error::{Result, SopsError};
use crate::ir::SchemaNode;

#[derive(Clone, Default)]
pub struct Session {
    backend: Option<Arc<dyn Backend>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl Session {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self { backend: Some(Arc::new(backend)) }
    }

    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn with_shared(backend: Arc<dyn Backend>) -> Self {
        Self { backend: Some(backend) }
    }

    pub fn set_backend(&mut self, backend: impl Backend + 'static) {
        self.backend = Some(Arc::new(backend));
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> Result<&dyn Backend> {
        self.backend.as_deref().ok_or_else(|| {
            SopsError::Configuration(
                "no backend is set; build the session with Session::new(backend) or call set_backend first".into(),
            )
        })
    }

    /// Plain text completion. No schema, no validation.
    pub fn plain(&self, prompt: &str) -> Result<String> {
        let backend = self.backend()?;
        tracing::debug!(prompt_len = prompt.len(), "plain query");
        Ok(backend.infer_text(prompt)?)
    }

    /// Structured completion, re-validated against `schema`'s source tree.
    pub fn structured(&self, prompt: &str, schema: &CompiledSchema) -> Result<Value> {
        let backend = self.backend()?;
        tracing::debug!(prompt_len = prompt.len(), name = schema.name(), "structured query");
        let value = backend.infer_json(prompt, schema.document(), schema.name())?;
        if let Err(err) = schema.validate(&value) {
            tracing::warn!(path = %err.path, "backend output rejected: {}", err.message);
            return Err(err.into());
        }
        Ok(value)
    }

    /// Yes/no question answered as `{"result": bool}`.
    pub fn boolean(&self, prompt: &str) -> Result<bool> {
        let schema = CompiledSchema::new(SchemaNode::object([("result", SchemaNode::boolean())]))?;
        let value = self.structured(prompt, &schema)?;
        match value.get("result") {
            Some(Value::Bool(result)) => Ok(*result),
            Some(_) => Err(SopsError::Shape("expected boolean value for key 'result'".into())),
            None => Err(SopsError::Shape("expected {\"result\": bool} output shape".into())),
        }
    }

    /// List of `element` values answered as `{"items": [element]}`.
    pub fn typed_list(&self, prompt: &str, element: SchemaNode) -> Result<Vec<Value>> {
        let schema = CompiledSchema::new(SchemaNode::object([("items", SchemaNode::list(element))]))?;
        let mut value = self.structured(prompt, &schema)?;
        match value.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(SopsError::Shape("expected list value for key 'items'".into())),
            None => Err(SopsError::Shape("expected {\"items\": list} output shape".into())),
        }
    }
}
