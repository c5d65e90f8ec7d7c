//! Structured output prompt schemas.
//!
//! Describe the shape you want back from a model, compile it into a strict
//! JSON schema for constrained generation, and re-validate whatever comes
//! back against the same tree.
//!
//! ```
//! use serde_json::json;
//! use sops::{CompiledSchema, RawSpec};
//!
//! let spec = RawSpec::from_json(&json!({
//!     "name": "string",
//!     "age": "integer",
//!     "likes": ["string"],
//!     "nickname": "string?",
//! }));
//! let schema = CompiledSchema::from_raw(&spec).unwrap();
//! assert_eq!(schema.document()["required"], json!(["name", "age", "likes", "nickname"]));
//!
//! let answer = json!({"name": "Alice", "age": "32", "likes": [], "nickname": null});
//! let err = schema.validate(&answer).unwrap_err();
//! assert_eq!(err.path.to_string(), "$.age");
//! ```
pub mod backend;
pub mod compile;
pub mod config;
pub mod error;
pub mod ir;
pub mod normalize;
pub mod path;
pub mod path_de;
pub mod query;
pub mod raw;
pub mod validate;

pub use backend::Backend;
pub use compile::{compile, CompiledSchema, OUTPUT_NAME};
pub use error::{BackendError, SchemaError, SopsError, ValidationError};
pub use ir::{EnumValues, Literal, Scalar, SchemaNode};
pub use normalize::normalize;
pub use path::{Path, Segment};
pub use query::Session;
pub use raw::{Marker, RawSpec};
pub use validate::validate;
