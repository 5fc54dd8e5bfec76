//! Runtime-walkable schema declarations for flow inputs and outputs.
//!
//! Schemas are data, not types: the normalizer walks them field by field, so
//! they must stay inspectable at runtime. Flow definitions bind a name to an
//! input schema, an output schema, and an opaque prompt template.

use std::collections::BTreeMap;

use serde_json::Value;

/// A concrete field-name-to-value mapping (flow input or output).
pub type Record = serde_json::Map<String, Value>;

/// The shape of a record: field name to field schema.
pub type Schema = BTreeMap<String, FieldSchema>;

/// The kind of value a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free-form text.
    String,
    /// Whole number, optionally bounded. Bounds are contracts on meaning
    /// (e.g. "5 is highest"), so out-of-range values fail validation.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Floating-point number, optionally bounded.
    Number { min: Option<f64>, max: Option<f64> },
    /// True/false.
    Boolean,
    /// One of a closed set of string values. Values outside the set fail
    /// validation; nothing is snapped to a nearest match.
    Enum(Vec<String>),
    /// Homogeneous list; every element conforms to the item schema.
    Array(Box<FieldSchema>),
    /// Nested record with its own schema.
    Object(Schema),
    /// Generated-at timestamp. The model's value is deliberately ignored:
    /// normalization stamps the current wall-clock time (RFC 3339).
    Timestamp,
}

impl FieldKind {
    /// Short name used in validation error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Number { .. } => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum(_) => "enum",
            FieldKind::Array(_) => "array",
            FieldKind::Object(_) => "object",
            FieldKind::Timestamp => "timestamp",
        }
    }
}

/// One node in a schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// What kind of value this field holds.
    pub kind: FieldKind,
    /// Whether the field must be present. Defaults to true.
    pub required: bool,
    /// Backfill value for an absent optional field. An optional field without
    /// a default stays absent when omitted.
    pub default: Option<Value>,
    /// Documentation only; forwarded to the provider schema, never enforced.
    pub description: Option<String>,
}

impl FieldSchema {
    /// A required field of the given kind.
    pub fn new(kind: FieldKind) -> Self {
        Self { kind, required: true, default: None, description: None }
    }

    /// Required string field.
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    /// Required boolean field.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Required unbounded integer field.
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer { min: None, max: None })
    }

    /// Required integer field with inclusive bounds.
    pub fn integer_between(min: i64, max: i64) -> Self {
        Self::new(FieldKind::Integer { min: Some(min), max: Some(max) })
    }

    /// Required unbounded number field.
    pub fn number() -> Self {
        Self::new(FieldKind::Number { min: None, max: None })
    }

    /// Required number field with inclusive bounds.
    pub fn number_between(min: f64, max: f64) -> Self {
        Self::new(FieldKind::Number { min: Some(min), max: Some(max) })
    }

    /// Required enum field over a closed set of string values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FieldKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// Required array field whose elements conform to `item`.
    pub fn array_of(item: FieldSchema) -> Self {
        Self::new(FieldKind::Array(Box::new(item)))
    }

    /// Required nested object field.
    pub fn object(fields: Schema) -> Self {
        Self::new(FieldKind::Object(fields))
    }

    /// Generated-at timestamp field, stamped at normalization time.
    pub fn timestamp() -> Self {
        Self::new(FieldKind::Timestamp)
    }

    /// Mark the field optional: absent is valid and stays absent.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the field optional with a backfill value: absent is backfilled.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Attach a documentation string.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Check structural well-formedness: a declared default must match the
    /// field's kind, enum sets must be non-empty, and nested schemas must be
    /// well-formed. `path` is the dotted location for error reporting.
    pub fn verify(&self, path: &str) -> Result<(), String> {
        if let FieldKind::Enum(values) = &self.kind {
            if values.is_empty() {
                return Err(format!("field '{path}': enum has no allowed values"));
            }
        }
        if let Some(default) = &self.default {
            if !kind_matches(&self.kind, default) {
                return Err(format!(
                    "field '{path}': default value does not match declared kind '{}'",
                    self.kind.name()
                ));
            }
        }
        match &self.kind {
            FieldKind::Array(item) => item.verify(&format!("{path}[]")),
            FieldKind::Object(fields) => verify_schema(fields, path),
            _ => Ok(()),
        }
    }
}

/// Verify every field in a schema, reporting the first malformed node.
pub fn verify_schema(schema: &Schema, path: &str) -> Result<(), String> {
    for (name, field) in schema {
        let child = if path.is_empty() { name.clone() } else { format!("{path}.{name}") };
        field.verify(&child)?;
    }
    Ok(())
}

fn kind_matches(kind: &FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::String | FieldKind::Timestamp => value.is_string(),
        FieldKind::Integer { .. } => value.as_i64().is_some(),
        FieldKind::Number { .. } => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Enum(allowed) => {
            value.as_str().is_some_and(|s| allowed.iter().any(|a| a == s))
        }
        FieldKind::Array(item) => value
            .as_array()
            .is_some_and(|items| items.iter().all(|v| kind_matches(&item.kind, v))),
        FieldKind::Object(_) => value.is_object(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_default_makes_field_optional() {
        let field = FieldSchema::string().with_default("n/a");
        assert!(!field.required);
        assert_eq!(field.default, Some(json!("n/a")));
    }

    #[test]
    fn verify_rejects_mismatched_default() {
        let field = FieldSchema::integer_between(1, 5).with_default("three");
        let err = field.verify("score").unwrap_err();
        assert!(err.contains("score"));
        assert!(err.contains("integer"));
    }

    #[test]
    fn verify_rejects_empty_enum() {
        let field = FieldSchema::one_of(Vec::<String>::new());
        assert!(field.verify("mood").is_err());
    }

    #[test]
    fn verify_recurses_into_nested_objects() {
        let mut inner = Schema::new();
        inner.insert("score".into(), FieldSchema::integer().with_default(json!(true)));
        let field = FieldSchema::object(inner);
        let err = field.verify("stats").unwrap_err();
        assert!(err.contains("stats.score"));
    }

    #[test]
    fn enum_default_must_be_in_set() {
        let ok = FieldSchema::one_of(["Buy", "Sell"]).with_default("Buy");
        assert!(ok.verify("recommendation").is_ok());
        let bad = FieldSchema::one_of(["Buy", "Sell"]).with_default("Hodl");
        assert!(bad.verify("recommendation").is_err());
    }
}
