//! Re-checks a value against the original `SchemaNode` tree.
//!
//! Independent of the compiled document: the backend's claim of strict
//! adherence is never trusted. Traversal order is fixed (object fields in
//! declaration order, list elements by index) and the first violation wins.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::ir::{Literal, Scalar, SchemaNode};
use crate::path::Path;

pub fn validate(value: &Value, node: &SchemaNode) -> Result<(), ValidationError> {
    validate_at(value, node, &Path::root())
}

pub fn validate_at(value: &Value, node: &SchemaNode, path: &Path) -> Result<(), ValidationError> {
    match node {
        SchemaNode::Object(fields) => {
            let Value::Object(map) = value else {
                return Err(expected("object", value, path));
            };
            validate_object(map, fields, path)
        }

        SchemaNode::List(element) => {
            let Value::Array(items) = value else {
                return Err(expected("list", value, path));
            };
            items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| validate_at(item, element, &path.index(i)))
        }

        SchemaNode::Enum(values) => {
            if values.contains(value) {
                Ok(())
            } else {
                Err(ValidationError::new(
                    format!("value {value} is not one of {}", render_literals(values.values())),
                    path,
                ))
            }
        }

        SchemaNode::Scalar(scalar) => {
            if scalar_accepts(*scalar, value) {
                Ok(())
            } else {
                Err(expected(scalar.type_name(), value, path))
            }
        }

        SchemaNode::Optional(inner) => match value {
            Value::Null => Ok(()),
            other => validate_at(other, inner, path),
        },
    }
}

fn validate_object(
    map: &Map<String, Value>,
    fields: &IndexMap<String, SchemaNode>,
    path: &Path,
) -> Result<(), ValidationError> {
    let extra: BTreeSet<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !fields.contains_key(*key))
        .collect();
    if !extra.is_empty() {
        let listed = extra.iter().map(|k| format!("{k:?}")).collect::<Vec<_>>().join(", ");
        return Err(ValidationError::new(format!("unexpected field(s) [{listed}]"), path));
    }

    for (name, field) in fields {
        let field_path = path.key(name);
        let (inner, optional) = field.unwrap_optional();
        match map.get(name) {
            None if optional => continue,
            None => {
                return Err(ValidationError::new(
                    format!("missing required field '{name}'"),
                    &field_path,
                ));
            }
            Some(Value::Null) if optional => continue,
            Some(Value::Null) => {
                return Err(ValidationError::new(
                    format!("field '{name}' cannot be null"),
                    &field_path,
                ));
            }
            Some(field_value) => validate_at(field_value, inner, &field_path)?,
        }
    }
    Ok(())
}

fn scalar_accepts(scalar: Scalar, value: &Value) -> bool {
    // `Value::Bool` is its own variant, so booleans can never pass as numbers
    match (scalar, value) {
        (Scalar::String, Value::String(_)) => true,
        (Scalar::Boolean, Value::Bool(_)) => true,
        (Scalar::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (Scalar::Number, Value::Number(_)) => true,
        _ => false,
    }
}

fn expected(what: &str, value: &Value, path: &Path) -> ValidationError {
    ValidationError::new(format!("expected {what}, got {}", kind_of(value)), path)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn render_literals(values: &[Literal]) -> String {
    let rendered: Vec<String> = values.iter().map(|lit| lit.to_json().to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

// ------------------------------- Tests ------------------------------------ //
