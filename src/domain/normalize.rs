//! Schema validation and normalization.
//!
//! One walker serves both ends of the pipeline: flow input is validated (and
//! default-backfilled) before rendering so a bad call never reaches the model,
//! and the model's candidate response is normalized before it reaches the
//! caller. A record is returned fully normalized or not at all; the only
//! value synthesis is declared default backfill and generated-at stamping.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::domain::schema::{FieldKind, FieldSchema, Record, Schema};

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReason {
    /// Required field absent (or null).
    Missing,
    /// Value present but of the wrong kind.
    TypeMismatch { expected: &'static str },
    /// Value outside the declared enum set.
    InvalidEnum { allowed: Vec<String> },
    /// Numeric value outside its declared bounds.
    OutOfRange { detail: String },
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::Missing => write!(f, "missing"),
            ValidationReason::TypeMismatch { expected } => {
                write!(f, "type mismatch (expected {expected})")
            }
            ValidationReason::InvalidEnum { allowed } => {
                write!(f, "not one of [{}]", allowed.join(", "))
            }
            ValidationReason::OutOfRange { detail } => write!(f, "out of range ({detail})"),
        }
    }
}

/// A validation failure at a specific field, reported with its dotted path.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("field '{field}': {reason}")]
pub struct ValidationError {
    /// Dotted path to the offending field (e.g. `holdings[2].allocationPct`).
    pub field: String,
    /// What went wrong.
    pub reason: ValidationReason,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self { field: field.into(), reason }
    }
}

/// Validate `candidate` against `schema`, backfilling declared defaults and
/// stamping generated-at fields with `now`.
///
/// Fields the schema does not declare are dropped. Any failure at any depth
/// fails the whole call; no partial record is ever returned. Given the same
/// `now`, normalization is idempotent.
pub fn normalize(
    schema: &Schema,
    candidate: &Value,
    now: DateTime<Utc>,
) -> Result<Record, ValidationError> {
    let supplied = candidate.as_object().ok_or_else(|| {
        ValidationError::new("$", ValidationReason::TypeMismatch { expected: "object" })
    })?;
    normalize_object(schema, supplied, "", now)
}

fn normalize_object(
    schema: &Schema,
    supplied: &Record,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<Record, ValidationError> {
    let mut out = Record::new();
    for (name, field) in schema {
        let path = join_path(prefix, name);
        match supplied.get(name) {
            Some(value) if !value.is_null() => {
                out.insert(name.clone(), normalize_value(field, value, &path, now)?);
            }
            _ => {
                // Generated-at fields are stamped whether supplied or not.
                if matches!(field.kind, FieldKind::Timestamp) {
                    out.insert(name.clone(), stamp(now));
                } else if field.required {
                    return Err(ValidationError::new(path, ValidationReason::Missing));
                } else if let Some(default) = &field.default {
                    out.insert(name.clone(), default.clone());
                }
                // Optional without default: absent stays absent.
            }
        }
    }
    Ok(out)
}

fn normalize_value(
    field: &FieldSchema,
    value: &Value,
    path: &str,
    now: DateTime<Utc>,
) -> Result<Value, ValidationError> {
    match &field.kind {
        FieldKind::String => match value.as_str() {
            Some(_) => Ok(value.clone()),
            None => Err(mismatch(path, "string")),
        },
        FieldKind::Boolean => match value.as_bool() {
            Some(_) => Ok(value.clone()),
            None => Err(mismatch(path, "boolean")),
        },
        FieldKind::Integer { min, max } => {
            let n = value.as_i64().ok_or_else(|| mismatch(path, "integer"))?;
            if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                return Err(ValidationError::new(
                    path,
                    ValidationReason::OutOfRange {
                        detail: format!("{n} not in {}..={}", bound(*min), bound(*max)),
                    },
                ));
            }
            Ok(value.clone())
        }
        FieldKind::Number { min, max } => {
            let n = value.as_f64().ok_or_else(|| mismatch(path, "number"))?;
            if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                return Err(ValidationError::new(
                    path,
                    ValidationReason::OutOfRange {
                        detail: format!("{n} not in {}..={}", bound(*min), bound(*max)),
                    },
                ));
            }
            Ok(value.clone())
        }
        FieldKind::Enum(allowed) => {
            let s = value.as_str().ok_or_else(|| mismatch(path, "enum"))?;
            if allowed.iter().any(|a| a == s) {
                Ok(value.clone())
            } else {
                Err(ValidationError::new(
                    path,
                    ValidationReason::InvalidEnum { allowed: allowed.clone() },
                ))
            }
        }
        FieldKind::Array(item) => {
            let items = value.as_array().ok_or_else(|| mismatch(path, "array"))?;
            let mut out = Vec::with_capacity(items.len());
            for (index, element) in items.iter().enumerate() {
                out.push(normalize_value(item, element, &format!("{path}[{index}]"), now)?);
            }
            Ok(Value::Array(out))
        }
        FieldKind::Object(fields) => {
            let supplied = value.as_object().ok_or_else(|| mismatch(path, "object"))?;
            Ok(Value::Object(normalize_object(fields, supplied, path, now)?))
        }
        // The model's value is deliberately ignored: wall-clock truth beats
        // whatever the model hallucinated.
        FieldKind::Timestamp => Ok(stamp(now)),
    }
}

fn stamp(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339())
}

fn mismatch(path: &str, expected: &'static str) -> ValidationError {
    ValidationError::new(path, ValidationReason::TypeMismatch { expected })
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") }
}

fn bound<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "..".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::FieldSchema;
    use serde_json::json;

    fn signal_schema() -> Schema {
        let mut schema = Schema::new();
        schema.insert(
            "recommendation".into(),
            FieldSchema::one_of(["Buy", "Sell", "Hold", "HODL"]),
        );
        schema.insert("reasoning".into(), FieldSchema::string());
        schema.insert("rocketScore".into(), FieldSchema::integer_between(1, 5));
        schema.insert(
            "disclaimer".into(),
            FieldSchema::string().with_default("Not financial advice."),
        );
        schema
    }

    #[test]
    fn conforming_candidate_passes_through_unchanged() {
        let candidate = json!({
            "recommendation": "Buy",
            "reasoning": "Community momentum is strong.",
            "rocketScore": 4,
            "disclaimer": "Custom disclaimer."
        });
        let out = normalize(&signal_schema(), &candidate, Utc::now()).unwrap();
        assert_eq!(Value::Object(out), candidate);
    }

    #[test]
    fn absent_optional_field_is_backfilled_with_default() {
        let candidate = json!({
            "recommendation": "Buy",
            "reasoning": "Community momentum is strong.",
            "rocketScore": 4
        });
        let out = normalize(&signal_schema(), &candidate, Utc::now()).unwrap();
        assert_eq!(out["disclaimer"], json!("Not financial advice."));
        assert_eq!(out["rocketScore"], json!(4));
        assert_eq!(out["recommendation"], json!("Buy"));
    }

    #[test]
    fn missing_required_field_fails() {
        let candidate = json!({ "recommendation": "Buy", "rocketScore": 4 });
        let err = normalize(&signal_schema(), &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.field, "reasoning");
        assert_eq!(err.reason, ValidationReason::Missing);
    }

    #[test]
    fn null_counts_as_absent() {
        let candidate = json!({
            "recommendation": "Buy",
            "reasoning": null,
            "rocketScore": 4
        });
        let err = normalize(&signal_schema(), &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.reason, ValidationReason::Missing);
    }

    #[test]
    fn type_mismatch_on_required_field_fails() {
        let candidate = json!({
            "recommendation": "Buy",
            "reasoning": 42,
            "rocketScore": 4
        });
        let err = normalize(&signal_schema(), &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.field, "reasoning");
        assert_eq!(err.reason, ValidationReason::TypeMismatch { expected: "string" });
    }

    #[test]
    fn out_of_range_integer_fails_instead_of_clamping() {
        let candidate = json!({
            "recommendation": "Buy",
            "reasoning": "To the moon.",
            "rocketScore": 7
        });
        let err = normalize(&signal_schema(), &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.field, "rocketScore");
        assert!(matches!(err.reason, ValidationReason::OutOfRange { .. }));
    }

    #[test]
    fn fractional_value_is_not_an_integer() {
        let candidate = json!({
            "recommendation": "Buy",
            "reasoning": "To the moon.",
            "rocketScore": 3.5
        });
        let err = normalize(&signal_schema(), &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.reason, ValidationReason::TypeMismatch { expected: "integer" });
    }

    #[test]
    fn enum_value_outside_set_fails() {
        let candidate = json!({
            "recommendation": "Yolo",
            "reasoning": "To the moon.",
            "rocketScore": 3
        });
        let err = normalize(&signal_schema(), &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.field, "recommendation");
        assert!(matches!(err.reason, ValidationReason::InvalidEnum { .. }));
    }

    #[test]
    fn undeclared_fields_are_dropped() {
        let candidate = json!({
            "recommendation": "Hold",
            "reasoning": "Sideways market.",
            "rocketScore": 2,
            "secretAlpha": "should not survive"
        });
        let out = normalize(&signal_schema(), &candidate, Utc::now()).unwrap();
        assert!(!out.contains_key("secretAlpha"));
    }

    #[test]
    fn optional_field_without_default_stays_absent() {
        let mut schema = Schema::new();
        schema.insert("note".into(), FieldSchema::string().optional());
        let out = normalize(&schema, &json!({}), Utc::now()).unwrap();
        assert!(!out.contains_key("note"));
    }

    #[test]
    fn timestamp_field_is_overwritten_with_now() {
        let mut schema = Schema::new();
        schema.insert("generatedAt".into(), FieldSchema::timestamp());
        let now = Utc::now();
        let candidate = json!({ "generatedAt": "1999-12-31T23:59:59Z" });
        let out = normalize(&schema, &candidate, now).unwrap();
        assert_eq!(out["generatedAt"], json!(now.to_rfc3339()));
    }

    #[test]
    fn timestamp_field_is_stamped_even_when_absent() {
        let mut schema = Schema::new();
        schema.insert("generatedAt".into(), FieldSchema::timestamp());
        let now = Utc::now();
        let out = normalize(&schema, &json!({}), now).unwrap();
        assert_eq!(out["generatedAt"], json!(now.to_rfc3339()));
    }

    #[test]
    fn nested_failure_fails_the_whole_call() {
        let mut holding = Schema::new();
        holding.insert("coinName".into(), FieldSchema::string());
        holding.insert("allocationPct".into(), FieldSchema::number_between(0.0, 100.0));
        let mut schema = Schema::new();
        schema.insert("holdings".into(), FieldSchema::array_of(FieldSchema::object(holding)));

        let candidate = json!({
            "holdings": [
                { "coinName": "DOGE", "allocationPct": 60.0 },
                { "coinName": "PEPE", "allocationPct": 140.0 }
            ]
        });
        let err = normalize(&schema, &candidate, Utc::now()).unwrap_err();
        assert_eq!(err.field, "holdings[1].allocationPct");
        assert!(matches!(err.reason, ValidationReason::OutOfRange { .. }));
    }

    #[test]
    fn non_object_candidate_fails_at_root() {
        let err = normalize(&signal_schema(), &json!("just text"), Utc::now()).unwrap_err();
        assert_eq!(err.field, "$");
    }

    mod idempotence {
        use super::*;
        use proptest::prelude::*;

        fn schema() -> Schema {
            let mut schema = Schema::new();
            schema.insert("coinName".into(), FieldSchema::string());
            schema.insert("rocketScore".into(), FieldSchema::integer_between(1, 5));
            schema.insert("confidence".into(), FieldSchema::number_between(0.0, 100.0).optional());
            schema.insert(
                "mood".into(),
                FieldSchema::one_of(["bullish", "bearish"]).with_default("bullish"),
            );
            schema.insert("generatedAt".into(), FieldSchema::timestamp());
            schema
        }

        proptest! {
            #[test]
            fn normalizing_twice_equals_normalizing_once(
                coin in "[A-Za-z]{1,12}",
                score in 1i64..=5,
                confidence in proptest::option::of(0.0f64..=100.0),
                mood in proptest::option::of(prop_oneof![Just("bullish"), Just("bearish")]),
            ) {
                let mut candidate = serde_json::Map::new();
                candidate.insert("coinName".into(), serde_json::json!(coin));
                candidate.insert("rocketScore".into(), serde_json::json!(score));
                if let Some(c) = confidence {
                    candidate.insert("confidence".into(), serde_json::json!(c));
                }
                if let Some(m) = mood {
                    candidate.insert("mood".into(), serde_json::json!(m));
                }

                let now = Utc::now();
                let schema = schema();
                let once = normalize(&schema, &Value::Object(candidate), now).unwrap();
                let twice = normalize(&schema, &Value::Object(once.clone()), now).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
