//! Caller-authored schema specs, before normalization.
//!
//! `RawSpec` deliberately mirrors the loose shapes people write by hand:
//! a mapping for an object, a one-element list for "list of", a union with
//! `null` for "optional", a literal set for an enum, or a bare type marker.
//! Nothing here is validated; that is `normalize`'s job.
//!
//! Specs read from JSON use a small string grammar for the leaves:
//!
//! ```text
//! "string" | "integer" | "number" | "boolean"   (aliases: str, int, float, bool)
//! "string?"                                     same as "string | null"
//! "literal(\"red\", \"green\")"                 finite value set (alias: enum(...))
//! ```
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawSpec {
    /// Keys are kept as raw JSON values so a non-string key can be reported.
    Map(Vec<(Value, RawSpec)>),
    Seq(Vec<RawSpec>),
    Union(Vec<RawSpec>),
    Literal(Vec<Value>),
    Marker(Marker),
    Unsupported(String),
}

static LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:literal|enum)\s*\((.*)\)$").expect("literal marker regex")
});

impl RawSpec {
    pub fn string() -> Self { RawSpec::Marker(Marker::String) }
    pub fn integer() -> Self { RawSpec::Marker(Marker::Integer) }
    pub fn number() -> Self { RawSpec::Marker(Marker::Number) }
    pub fn boolean() -> Self { RawSpec::Marker(Marker::Boolean) }

    pub fn list(element: RawSpec) -> Self {
        RawSpec::Seq(vec![element])
    }

    pub fn optional(inner: RawSpec) -> Self {
        RawSpec::Union(vec![inner, RawSpec::Marker(Marker::Null)])
    }

    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        RawSpec::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RawSpec)>,
    {
        RawSpec::Map(
            fields
                .into_iter()
                .map(|(k, v)| (Value::String(k.into()), v))
                .collect(),
        )
    }

    /// Reads a spec written as JSON. Total: shapes that mean nothing become
    /// `Unsupported` and are rejected later with a path.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => RawSpec::Map(
                map.iter()
                    .map(|(k, v)| (Value::String(k.clone()), RawSpec::from_json(v)))
                    .collect(),
            ),
            Value::Array(xs) => RawSpec::Seq(xs.iter().map(RawSpec::from_json).collect()),
            Value::String(src) => parse_marker(src),
            other => RawSpec::Unsupported(other.to_string()),
        }
    }
}

fn parse_marker(src: &str) -> RawSpec {
    let src = src.trim();
    if let Some(inner) = src.strip_suffix('?') {
        return RawSpec::optional(parse_marker(inner));
    }
    let alternatives = split_top_level(src, '|');
    if alternatives.len() > 1 {
        return RawSpec::Union(alternatives.into_iter().map(parse_marker).collect());
    }
    if let Some(caps) = LITERAL_RE.captures(src) {
        let args = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return match serde_json::from_str::<Vec<Value>>(&format!("[{args}]")) {
            Ok(values) => RawSpec::Literal(values),
            Err(_) => RawSpec::Unsupported(format!("{src:?}")),
        };
    }
    match src {
        "string" | "str" => RawSpec::Marker(Marker::String),
        "integer" | "int" => RawSpec::Marker(Marker::Integer),
        "number" | "float" => RawSpec::Marker(Marker::Number),
        "boolean" | "bool" => RawSpec::Marker(Marker::Boolean),
        "null" | "none" => RawSpec::Marker(Marker::Null),
        _ => RawSpec::Unsupported(format!("{src:?}")),
    }
}

/// Splits on `sep` outside of parentheses and JSON string literals.
fn split_top_level(src: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in src.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&src[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&src[start..]);
    parts
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitive_markers_and_aliases() {
        assert_eq!(RawSpec::from_json(&json!("string")), RawSpec::string());
        assert_eq!(RawSpec::from_json(&json!("int")), RawSpec::integer());
        assert_eq!(RawSpec::from_json(&json!(" float ")), RawSpec::number());
        assert_eq!(RawSpec::from_json(&json!("bool")), RawSpec::boolean());
    }

    #[test]
    fn question_mark_is_nullable_union() {
        assert_eq!(
            RawSpec::from_json(&json!("string?")),
            RawSpec::optional(RawSpec::string())
        );
        assert_eq!(
            RawSpec::from_json(&json!("integer | null")),
            RawSpec::Union(vec![RawSpec::integer(), RawSpec::Marker(Marker::Null)])
        );
    }

    #[test]
    fn literal_arguments_are_json() {
        assert_eq!(
            RawSpec::from_json(&json!(r#"literal("a|b", "c")"#)),
            RawSpec::literal(["a|b", "c"])
        );
        assert_eq!(
            RawSpec::from_json(&json!("enum(1, 2, 3)")),
            RawSpec::literal([1, 2, 3])
        );
        assert_eq!(
            RawSpec::from_json(&json!(r#"literal("x") | null"#)),
            RawSpec::Union(vec![RawSpec::literal(["x"]), RawSpec::Marker(Marker::Null)])
        );
    }

    #[test]
    fn containers_keep_declaration_order() {
        let spec = RawSpec::from_json(&json!({"b": "string", "a": ["integer"]}));
        assert_eq!(
            spec,
            RawSpec::object([
                ("b", RawSpec::string()),
                ("a", RawSpec::list(RawSpec::integer())),
            ])
        );
    }

    #[test]
    fn unknown_shapes_are_unsupported() {
        assert!(matches!(RawSpec::from_json(&json!("datetime")), RawSpec::Unsupported(_)));
        assert!(matches!(RawSpec::from_json(&json!(42)), RawSpec::Unsupported(_)));
        assert!(matches!(RawSpec::from_json(&json!("literal(oops)")), RawSpec::Unsupported(_)));
    }
}
