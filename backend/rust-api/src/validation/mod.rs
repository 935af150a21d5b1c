//! Field-by-field request validation.
//!
//! Request bodies are inspected as raw JSON so that a missing field, a
//! field of the wrong type and an out-of-range value can be reported
//! separately, each with its own response shape.

pub mod category;
pub mod question;

use serde::Serialize;
use serde_json::{json, Map, Value};

pub use category::{
    check_new_category, duplicate_name, validate_category_patch, validate_new_category,
};
pub use question::{
    check_answer_in_options, parse_question_count, validate_new_question,
    validate_question_patch,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ErrorKind {
    MissingParameters,
    InvalidType,
    InvalidEnum,
    InvalidShape,
    InvalidReference,
    ValidationFailure,
}

/// A rejected request field. `body` is the JSON sent back to the client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct FieldError {
    pub kind: ErrorKind,
    pub message: String,
    pub body: Value,
}

impl FieldError {
    fn new(kind: ErrorKind, message: impl Into<String>, extra: Option<(&str, Value)>) -> Self {
        let message = message.into();
        let mut body = Map::new();
        body.insert("message".to_string(), json!(message));
        if let Some((key, value)) = extra {
            body.insert(key.to_string(), value);
        }
        Self {
            kind,
            message,
            body: Value::Object(body),
        }
    }

    pub fn missing(fields: Vec<&str>) -> Self {
        Self::new(
            ErrorKind::MissingParameters,
            "Missing parameters",
            Some(("missing", json!(fields))),
        )
    }

    pub fn invalid_type(fields: Vec<String>) -> Self {
        Self::new(
            ErrorKind::InvalidType,
            "Parameters must be strings",
            Some(("invalidParams", json!(fields))),
        )
    }

    /// Non-string fields carry their names; a bad scalar parameter carries
    /// its raw value
    pub fn invalid_type_value(message: impl Into<String>, value: &Value) -> Self {
        Self::new(
            ErrorKind::InvalidType,
            message,
            Some(("invalidParams", value.clone())),
        )
    }

    pub fn invalid_enum(message: impl Into<String>, value: &Value) -> Self {
        Self::new(
            ErrorKind::InvalidEnum,
            message,
            Some(("invalidParams", value.clone())),
        )
    }

    pub fn invalid_shape(message: impl Into<String>, value: &Value) -> Self {
        Self::new(
            ErrorKind::InvalidShape,
            message,
            Some(("invalidParams", value.clone())),
        )
    }

    pub fn invalid_reference(message: impl Into<String>, value: &Value) -> Self {
        Self::new(
            ErrorKind::InvalidReference,
            message,
            Some(("invalidParams", value.clone())),
        )
    }

    /// Schema-level rejection (length limits, duplicate keys)
    pub fn validation_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailure, message, None)
    }

    pub fn from_validation_errors(errors: &validator::ValidationErrors) -> Self {
        Self::validation_failure(format!("Validation failed: {}", errors))
    }
}

pub(crate) fn fields_of(body: &Value) -> Map<String, Value> {
    body.as_object().cloned().unwrap_or_default()
}

/// Absent, `null` and `""` all count as not provided
pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Fields present in `fields` whose value is not a JSON string, in the
/// order of `names`
pub(crate) fn non_string_fields(fields: &Map<String, Value>, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| matches!(fields.get(**name), Some(value) if !value.is_string()))
        .map(|name| name.to_string())
        .collect()
}

pub(crate) fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn first_error(errors: Vec<FieldError>) -> FieldError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| FieldError::validation_failure("Invalid request"))
}
