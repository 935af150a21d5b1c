use mongodb::bson::oid::ObjectId;
use serde_json::{Map, Value};

use super::{fields_of, is_blank, non_string_fields, string_field, FieldError};
use crate::models::question::OPTION_COUNT;
use crate::models::{NewQuestion, QuestionPatch};

const REQUIRED_FIELDS: [&str; 4] = ["questionText", "options", "correctAnswer", "categoryId"];
const STRING_FIELDS: [&str; 4] = ["questionText", "correctAnswer", "explanation", "categoryId"];

/// Options must be exactly four non-empty strings
pub fn check_options(value: &Value) -> Result<Vec<String>, FieldError> {
    let items = match value.as_array() {
        Some(items) if items.len() == OPTION_COUNT => items,
        _ => {
            return Err(FieldError::invalid_shape(
                format!("Options must be an array of {} elements", OPTION_COUNT),
                value,
            ))
        }
    };

    if items.iter().any(|item| is_blank(Some(item))) {
        return Err(FieldError::invalid_shape(
            "Options must not contain null or empty values",
            value,
        ));
    }

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| FieldError::invalid_type(vec!["options".to_string()]))
        })
        .collect()
}

pub fn check_answer_in_options(options: &[String], answer: &str) -> Result<(), FieldError> {
    if options.iter().any(|option| option == answer) {
        Ok(())
    } else {
        Err(FieldError::invalid_shape(
            "Correct answer must be one of the options",
            &Value::String(answer.to_string()),
        ))
    }
}

/// `n` in `/questions/random/{n}`: a positive integer written in digits
pub fn parse_question_count(raw: &str) -> Result<usize, FieldError> {
    match raw.parse::<usize>() {
        Ok(count) if count > 0 && raw.chars().all(|c| c.is_ascii_digit()) => Ok(count),
        _ => Err(FieldError::invalid_type_value(
            "Number of questions must be a positive integer",
            &Value::String(raw.to_string()),
        )),
    }
}

/// A category id that is not an ObjectId can never resolve
fn parse_category_id(raw: &str) -> Result<ObjectId, FieldError> {
    ObjectId::parse_str(raw)
        .map_err(|_| FieldError::invalid_reference("Category not found", &Value::String(raw.into())))
}

/// String fields present with a non-null value must be strings.
/// `explanation: null` on create is treated as absent.
fn check_create_types(fields: &Map<String, Value>) -> Result<(), FieldError> {
    let mut present = fields.clone();
    if matches!(present.get("explanation"), Some(Value::Null)) {
        present.remove("explanation");
    }

    let non_strings = non_string_fields(&present, &STRING_FIELDS);
    if non_strings.is_empty() {
        Ok(())
    } else {
        Err(FieldError::invalid_type(non_strings))
    }
}

/// Checks a create body rule by rule and stops at the first failure.
/// Whether `categoryId` exists is left to the caller.
pub fn validate_new_question(body: &Value) -> Result<NewQuestion, FieldError> {
    let fields = fields_of(body);

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| match fields.get(*name) {
            // an empty options array is a shape problem, not a missing field
            Some(Value::Array(_)) => false,
            other => is_blank(other),
        })
        .collect();
    if !missing.is_empty() {
        return Err(FieldError::missing(missing));
    }

    check_create_types(&fields)?;

    let options = check_options(fields.get("options").unwrap_or(&Value::Null))?;

    let correct_answer = string_field(&fields, "correctAnswer").unwrap_or_default();
    check_answer_in_options(&options, &correct_answer)?;

    let category_id = parse_category_id(&string_field(&fields, "categoryId").unwrap_or_default())?;

    Ok(NewQuestion {
        question_text: string_field(&fields, "questionText").unwrap_or_default(),
        options,
        correct_answer,
        explanation: string_field(&fields, "explanation"),
        category_id,
    })
}

/// Only fields present in the body are checked. Consistency between the
/// answer and the stored options needs the current record, see
/// `check_answer_in_options`.
pub fn validate_question_patch(body: &Value) -> Result<QuestionPatch, FieldError> {
    let fields = fields_of(body);

    let non_strings = non_string_fields(&fields, &STRING_FIELDS);
    if !non_strings.is_empty() {
        return Err(FieldError::invalid_type(non_strings));
    }

    let options = match fields.get("options") {
        Some(raw) => Some(check_options(raw)?),
        None => None,
    };

    let category_id = match string_field(&fields, "categoryId") {
        Some(raw) => Some(parse_category_id(&raw)?),
        None => None,
    };

    Ok(QuestionPatch {
        question_text: string_field(&fields, "questionText"),
        options,
        correct_answer: string_field(&fields, "correctAnswer"),
        explanation: string_field(&fields, "explanation"),
        category_id,
    })
}
