//! `SchemaNode` → strict constraint document.
//!
//! Strict structured output wants closed objects whose properties are all
//! listed in `required`. Optional fields therefore stay required and become
//! `anyOf: [T, null]`: the model must emit the key, and may emit `null`.
use serde_json::{json, Map, Value};

use crate::error::{SchemaError, ValidationError};
use crate::ir::SchemaNode;
use crate::normalize::normalize;
use crate::path::Path;
use crate::raw::RawSpec;
use crate::validate::validate;

/// Name under which every compiled document is sent to the backend.
pub const OUTPUT_NAME: &str = "sops_output";

pub fn compile(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::Scalar(scalar) => json!({ "type": scalar.type_name() }),

        SchemaNode::Enum(values) => json!({
            "enum": values.values().iter().map(|lit| lit.to_json()).collect::<Vec<_>>()
        }),

        SchemaNode::List(element) => json!({
            "type": "array",
            "items": compile(element),
        }),

        SchemaNode::Object(fields) => {
            let mut properties = Map::with_capacity(fields.len());
            let mut required = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                properties.insert(name.clone(), compile(field));
                required.push(Value::String(name.clone()));
            }
            json!({
                "type": "object",
                "properties": properties,
                "additionalProperties": false,
                "required": required,
            })
        }

        SchemaNode::Optional(inner) => {
            debug_assert!(!inner.is_optional(), "Optional wrapping Optional reached the compiler");
            json!({ "anyOf": [compile(inner), { "type": "null" }] })
        }
    }
}

/// A compiled document together with the tree it came from.
///
/// Fields are private so the document can never drift from `source`.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    document: Value,
    name: &'static str,
    source: SchemaNode,
}

impl CompiledSchema {
    /// Compiles an object-rooted tree.
    pub fn new(source: SchemaNode) -> Result<Self, SchemaError> {
        if !matches!(source, SchemaNode::Object(_)) {
            return Err(SchemaError::new(
                "structured output schemas must have an object at the root",
                &Path::root(),
            ));
        }
        let document = compile(&source);
        tracing::debug!(name = OUTPUT_NAME, "compiled schema");
        Ok(Self { document, name: OUTPUT_NAME, source })
    }

    /// Normalizes and compiles a caller spec in one step.
    pub fn from_raw(raw: &RawSpec) -> Result<Self, SchemaError> {
        if !matches!(raw, RawSpec::Map(_)) {
            return Err(SchemaError::new(
                "expected a mapping at the root of the schema spec",
                &Path::root(),
            ));
        }
        Self::new(normalize(raw)?)
    }

    pub fn document(&self) -> &Value { &self.document }
    pub fn name(&self) -> &'static str { self.name }
    pub fn source(&self) -> &SchemaNode { &self.source }

    /// Re-checks a value against the source tree, not the document.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        validate(value, &self.source)
    }

    pub fn response_format(&self) -> Value {
        response_format(&self.document, self.name)
    }
}

/// The strict `json_schema` response-format payload for a compiled document.
pub fn response_format(document: &Value, name: &str) -> Value {
    json!({
        "type": "json_schema",
        "name": name,
        "schema": document,
        "strict": true,
    })
}

// ------------------------------- Tests ------------------------------------ //
