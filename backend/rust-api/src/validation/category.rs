use serde_json::Value;

use super::{fields_of, first_error, is_blank, non_string_fields, string_field, FieldError};
use crate::models::{CategoryPatch, Language, NewCategory};

/// Declaration order; `missing` lists follow it
const CATEGORY_FIELDS: [&str; 3] = ["name", "description", "language"];

fn language_error(value: &Value) -> FieldError {
    FieldError::invalid_enum(
        format!("Language must be part of [{}]", Language::ALLOWED.join(",")),
        value,
    )
}

/// Runs every category rule and returns all failures.
///
/// A missing field short-circuits. Otherwise the string check and the
/// language check run independently, so a record with a non-string
/// language reports both.
pub fn check_new_category(body: &Value) -> Result<NewCategory, Vec<FieldError>> {
    let fields = fields_of(body);

    let missing: Vec<&str> = CATEGORY_FIELDS
        .iter()
        .copied()
        .filter(|name| is_blank(fields.get(*name)))
        .collect();
    if !missing.is_empty() {
        return Err(vec![FieldError::missing(missing)]);
    }

    let mut errors = Vec::new();

    let non_strings = non_string_fields(&fields, &CATEGORY_FIELDS);
    if !non_strings.is_empty() {
        errors.push(FieldError::invalid_type(non_strings));
    }

    let raw_language = fields.get("language").cloned().unwrap_or(Value::Null);
    let language = match raw_language.as_str().map(str::parse::<Language>) {
        Some(Ok(language)) => Some(language),
        _ => {
            errors.push(language_error(&raw_language));
            None
        }
    };

    match (language, errors.is_empty()) {
        (Some(language), true) => Ok(NewCategory {
            name: string_field(&fields, "name").unwrap_or_default(),
            description: string_field(&fields, "description").unwrap_or_default(),
            language,
        }),
        _ => Err(errors),
    }
}

/// Single-record create: first failing rule wins
pub fn validate_new_category(body: &Value) -> Result<NewCategory, FieldError> {
    check_new_category(body).map_err(first_error)
}

/// A name already stored, or claimed by an earlier record of the same batch
pub fn duplicate_name(name: &str) -> FieldError {
    FieldError::new(
        super::ErrorKind::ValidationFailure,
        "Category name must be unique",
        Some(("invalidParams", Value::String(name.to_string()))),
    )
}

/// Only fields present in the body are checked; unknown keys are ignored.
pub fn validate_category_patch(body: &Value) -> Result<CategoryPatch, FieldError> {
    let fields = fields_of(body);

    let non_strings = non_string_fields(&fields, &CATEGORY_FIELDS);
    if !non_strings.is_empty() {
        return Err(FieldError::invalid_type(non_strings));
    }

    let language = match fields.get("language") {
        Some(raw) => Some(
            raw.as_str()
                .and_then(|value| value.parse::<Language>().ok())
                .ok_or_else(|| language_error(raw))?,
        ),
        None => None,
    };

    Ok(CategoryPatch {
        name: string_field(&fields, "name"),
        description: string_field(&fields, "description"),
        language,
    })
}
