//! `RawSpec` → `SchemaNode`.
//!
//! Two passes: a key check over the whole raw tree, then conversion. The key
//! check runs first so a bad key deep in the spec is reported before any node
//! is built.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::Value;

use crate::error::SchemaError;
use crate::ir::{EnumError, EnumValues, Literal, Scalar, SchemaNode};
use crate::path::Path;
use crate::raw::{Marker, RawSpec};

pub fn normalize(raw: &RawSpec) -> Result<SchemaNode, SchemaError> {
    ensure_string_keys(raw, &Path::root())?;
    let node = normalize_at(raw, &Path::root())?;
    tracing::debug!(kind = node_kind(&node), "normalized schema spec");
    Ok(node)
}

// -------------------- pass 1: keys --------------------

fn ensure_string_keys(raw: &RawSpec, path: &Path) -> Result<(), SchemaError> {
    match raw {
        RawSpec::Map(entries) => {
            for (key, sub) in entries {
                let Some(name) = key.as_str() else {
                    return Err(SchemaError::new(
                        format!("object schema keys must be strings, found {key}"),
                        path,
                    ));
                };
                ensure_string_keys(sub, &path.key(name))?;
            }
            Ok(())
        }
        RawSpec::Seq(items) => {
            items.iter().try_for_each(|item| ensure_string_keys(item, &path.items()))
        }
        RawSpec::Union(alternatives) => {
            alternatives.iter().try_for_each(|alt| ensure_string_keys(alt, path))
        }
        RawSpec::Literal(_) | RawSpec::Marker(_) | RawSpec::Unsupported(_) => Ok(()),
    }
}

// -------------------- pass 2: conversion --------------------

fn normalize_at(raw: &RawSpec, path: &Path) -> Result<SchemaNode, SchemaError> {
    match raw {
        RawSpec::Map(entries) => {
            let mut fields = IndexMap::with_capacity(entries.len());
            for (key, sub) in entries {
                // string-ness already checked in pass 1
                let name = key.as_str().unwrap_or_default();
                let field_path = path.key(name);
                let node = normalize_at(sub, &field_path)?;
                if fields.insert(name.to_string(), node).is_some() {
                    return Err(SchemaError::new(format!("duplicate field '{name}'"), path));
                }
            }
            Ok(SchemaNode::Object(fields))
        }

        RawSpec::Seq(items) => match items.as_slice() {
            [element] => Ok(SchemaNode::list(normalize_at(element, &path.items())?)),
            _ => Err(SchemaError::new(
                format!(
                    "list schema shorthand must contain exactly one item type, found {}",
                    items.len()
                ),
                path,
            )),
        },

        RawSpec::Union(alternatives) => normalize_union(alternatives, path),

        RawSpec::Literal(values) => normalize_literal(values, path),

        RawSpec::Marker(marker) => match marker {
            Marker::String => Ok(SchemaNode::Scalar(Scalar::String)),
            Marker::Integer => Ok(SchemaNode::Scalar(Scalar::Integer)),
            Marker::Number => Ok(SchemaNode::Scalar(Scalar::Number)),
            Marker::Boolean => Ok(SchemaNode::Scalar(Scalar::Boolean)),
            Marker::Null => Err(SchemaError::new(
                "null is only allowed as the second half of an optional type (T | null)",
                path,
            )),
        },

        RawSpec::Unsupported(found) => {
            Err(SchemaError::new(format!("unsupported schema type {found}"), path))
        }
    }
}

fn normalize_union(alternatives: &[RawSpec], path: &Path) -> Result<SchemaNode, SchemaError> {
    let mut flat = Vec::new();
    flatten_union(alternatives, &mut flat);

    let has_null = flat.iter().any(|alt| matches!(alt, RawSpec::Marker(Marker::Null)));
    let non_null: Vec<&RawSpec> = flat
        .into_iter()
        .filter(|alt| !matches!(alt, RawSpec::Marker(Marker::Null)))
        .collect();

    match (has_null, non_null.as_slice()) {
        (true, [inner]) => Ok(SchemaNode::optional(normalize_at(inner, path)?)),
        (false, [only]) => normalize_at(only, path),
        (true, []) => Err(SchemaError::new(
            "optional type needs exactly one non-null alternative, found none",
            path,
        )),
        (true, many) => Err(SchemaError::new(
            format!(
                "optional type needs exactly one non-null alternative, found {}",
                many.len()
            ),
            path,
        )),
        (false, _) => Err(SchemaError::new(
            "only optional unions (T | null) are supported",
            path,
        )),
    }
}

fn flatten_union<'a>(alternatives: &'a [RawSpec], out: &mut Vec<&'a RawSpec>) {
    for alt in alternatives {
        match alt {
            RawSpec::Union(nested) => flatten_union(nested, out),
            other => out.push(other),
        }
    }
}

fn normalize_literal(values: &[Value], path: &Path) -> Result<SchemaNode, SchemaError> {
    let literals = values
        .iter()
        .map(|value| literal_from_json(value).map_err(|reason| SchemaError::new(reason, path)))
        .collect::<Result<Vec<_>, _>>()?;

    let values = EnumValues::new(literals).map_err(|err| {
        let message = match err {
            EnumError::Empty => "literal must include at least one value".to_string(),
            EnumError::MixedKinds { first, other } => format!(
                "literal values must all be of one kind, found {first} and {other}"
            ),
            EnumError::NonFinite => "literal numbers must be finite".to_string(),
        };
        SchemaError::new(message, path)
    })?;
    Ok(SchemaNode::Enum(values))
}

fn literal_from_json(value: &Value) -> Result<Literal, String> {
    match value {
        Value::String(s) => Ok(Literal::String(s.clone())),
        Value::Bool(b) => Ok(Literal::Boolean(*b)),
        Value::Number(n) if n.is_f64() => {
            Ok(Literal::Number(OrderedFloat(n.as_f64().unwrap_or(f64::NAN))))
        }
        Value::Number(n) => n
            .as_i64()
            .map(Literal::Integer)
            .ok_or_else(|| format!("integer literal {n} is out of range")),
        Value::Null => Err("null is not allowed as a literal value; make the field optional instead".into()),
        other => Err(format!(
            "unsupported literal value {other}; use strings, integers, numbers or booleans"
        )),
    }
}

fn node_kind(node: &SchemaNode) -> &'static str {
    match node {
        SchemaNode::Scalar(scalar) => scalar.type_name(),
        SchemaNode::Enum(_) => "enum",
        SchemaNode::List(_) => "list",
        SchemaNode::Object(_) => "object",
        SchemaNode::Optional(_) => "optional",
    }
}

// ------------------------------- Tests ------------------------------------ //
