// Closed schema tree. Built once by `normalize`, then only pattern-matched.

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    String,
    Integer,
    Number,
    Boolean,
}

impl Scalar {
    /// JSON Schema `type` keyword for this scalar.
    pub fn type_name(self) -> &'static str {
        match self {
            Scalar::String => "string",
            Scalar::Integer => "integer",
            Scalar::Number => "number",
            Scalar::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    String(String),
    Integer(i64),
    Number(OrderedFloat<f64>),
    Boolean(bool),
}

impl Literal {
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::String(_) => "string",
            Literal::Integer(_) => "integer",
            Literal::Number(_) => "number",
            Literal::Boolean(_) => "boolean",
        }
    }

    /// Enum kind used for the single-kind check; integers and numbers share one.
    pub fn family(&self) -> &'static str {
        match self {
            Literal::Integer(_) | Literal::Number(_) => "number",
            other => other.kind(),
        }
    }

    /// No cross-kind coercion: `true` never matches `1` and `"1"` never matches `1`.
    /// An integer literal wants an integer-represented value; a number literal
    /// compares numerically, so `2.0` accepts `2`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::String(a), Value::String(b)) => a == b,
            (Literal::Integer(a), Value::Number(n)) => !n.is_f64() && n.as_i64() == Some(*a),
            (Literal::Number(a), Value::Number(n)) => n.as_f64() == Some(a.0),
            (Literal::Boolean(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Integer(i) => Value::from(*i),
            // finite by construction (see `EnumValues::new`)
            Literal::Number(f) => serde_json::Number::from_f64(f.0).map(Value::Number).unwrap_or(Value::Null),
            Literal::Boolean(b) => Value::Bool(*b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumError {
    Empty,
    MixedKinds { first: &'static str, other: &'static str },
    NonFinite,
}

/// Non-empty, single-kind, duplicate-free literal set in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValues(Vec<Literal>);

impl EnumValues {
    pub fn new(values: impl IntoIterator<Item = Literal>) -> Result<Self, EnumError> {
        let values: IndexSet<Literal> = values.into_iter().collect();
        let first = values.first().ok_or(EnumError::Empty)?.family();
        for value in &values {
            if value.family() != first {
                return Err(EnumError::MixedKinds { first, other: value.family() });
            }
            if let Literal::Number(f) = value {
                if !f.0.is_finite() {
                    return Err(EnumError::NonFinite);
                }
            }
        }
        Ok(Self(values.into_iter().collect()))
    }

    pub fn values(&self) -> &[Literal] { &self.0 }

    pub fn kind(&self) -> &'static str {
        // non-empty by construction
        self.0.first().map(Literal::family).unwrap_or("string")
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|lit| lit.matches(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Scalar(Scalar),
    Enum(EnumValues),
    List(Box<SchemaNode>),
    Object(IndexMap<String, SchemaNode>),  // declaration order
    Optional(Box<SchemaNode>),             // never directly wraps another Optional
}

impl SchemaNode {
    pub fn string() -> Self { SchemaNode::Scalar(Scalar::String) }
    pub fn integer() -> Self { SchemaNode::Scalar(Scalar::Integer) }
    pub fn number() -> Self { SchemaNode::Scalar(Scalar::Number) }
    pub fn boolean() -> Self { SchemaNode::Scalar(Scalar::Boolean) }

    pub fn list(element: SchemaNode) -> Self {
        SchemaNode::List(Box::new(element))
    }

    /// Wraps `inner` as nullable; already-optional nodes are returned as is.
    pub fn optional(inner: SchemaNode) -> Self {
        match inner {
            SchemaNode::Optional(_) => inner,
            other => SchemaNode::Optional(Box::new(other)),
        }
    }

    /// Builds an object node in the given field order.
    ///
    /// Field names must be unique. Debug builds panic on a repeated name;
    /// release builds keep the later field in the earlier field's position.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SchemaNode)>,
    {
        let mut map = IndexMap::new();
        for (name, field) in fields {
            let name = name.into();
            debug_assert!(!map.contains_key(&name), "duplicate field {name:?} in SchemaNode::object");
            map.insert(name, field);
        }
        SchemaNode::Object(map)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, SchemaNode::Optional(_))
    }

    /// Splits a field spec into its inner node and whether it is nullable.
    pub fn unwrap_optional(&self) -> (&SchemaNode, bool) {
        match self {
            SchemaNode::Optional(inner) => (&**inner, true),
            other => (other, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_values_keep_first_occurrence_order() {
        let values = EnumValues::new([
            Literal::String("b".into()),
            Literal::String("a".into()),
            Literal::String("b".into()),
        ]).unwrap();
        assert_eq!(values.values(), &[Literal::String("b".into()), Literal::String("a".into())]);
        assert_eq!(values.kind(), "string");
    }

    #[test]
    fn enum_values_reject_empty_and_mixed() {
        assert_eq!(EnumValues::new(Vec::new()), Err(EnumError::Empty));
        assert_eq!(
            EnumValues::new([Literal::Integer(1), Literal::String("1".into())]),
            Err(EnumError::MixedKinds { first: "number", other: "string" })
        );
        assert_eq!(
            EnumValues::new([Literal::Boolean(true), Literal::Integer(1)]),
            Err(EnumError::MixedKinds { first: "boolean", other: "number" })
        );
        assert_eq!(EnumValues::new([Literal::Number(OrderedFloat(f64::NAN))]), Err(EnumError::NonFinite));
    }

    #[test]
    fn literals_match_without_coercion() {
        assert!(Literal::Integer(1).matches(&json!(1)));
        assert!(!Literal::Integer(1).matches(&json!(1.0)));
        assert!(!Literal::Integer(1).matches(&json!(true)));
        assert!(Literal::Number(OrderedFloat(2.5)).matches(&json!(2.5)));
        assert!(Literal::Number(OrderedFloat(2.0)).matches(&json!(2)));
        assert!(!Literal::Number(OrderedFloat(1.0)).matches(&json!(true)));
        assert!(!Literal::Boolean(true).matches(&json!(1)));
        assert!(!Literal::String("1".into()).matches(&json!(1)));
    }

    #[test]
    fn integer_and_number_literals_share_a_kind() {
        let values = EnumValues::new([Literal::Integer(1), Literal::Number(OrderedFloat(2.5))]).unwrap();
        assert_eq!(values.kind(), "number");
        assert!(values.contains(&json!(1)));
        assert!(values.contains(&json!(2.5)));
        assert!(!values.contains(&json!(1.5)));
    }

    #[test]
    fn object_keeps_declaration_order() {
        let node = SchemaNode::object([("b", SchemaNode::string()), ("a", SchemaNode::integer())]);
        let SchemaNode::Object(fields) = node else { panic!("expected object") };
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "duplicate field \"a\"")]
    fn object_rejects_repeated_names_in_debug_builds() {
        SchemaNode::object([("a", SchemaNode::string()), ("a", SchemaNode::integer())]);
    }

    #[test]
    fn optional_does_not_nest() {
        let once = SchemaNode::optional(SchemaNode::string());
        let twice = SchemaNode::optional(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.unwrap_optional(), (&SchemaNode::string(), true));
    }
}
