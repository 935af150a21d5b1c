use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::bson_datetime_as_chrono;

pub const QUESTIONS_COLLECTION: &str = "questions";

/// Number of options every question carries
pub const OPTION_COUNT: usize = 4;

/// Question model stored in MongoDB "questions" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub question_text: String,

    pub options: Vec<String>,

    pub correct_answer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// ref: categories (existence checked explicitly before writes)
    pub category_id: ObjectId,

    /// Free-form reports attached to the question
    #[serde(default)]
    pub flags: Vec<Document>,

    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Question as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub category_id: String,
    #[serde(default)]
    pub flags: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        QuestionResponse {
            id: question.id.map(|id| id.to_hex()).unwrap_or_default(),
            question_text: question.question_text,
            options: question.options,
            correct_answer: question.correct_answer,
            explanation: question.explanation,
            category_id: question.category_id.to_hex(),
            flags: question
                .flags
                .into_iter()
                .filter_map(|flag| serde_json::to_value(flag).ok())
                .collect(),
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }
}

/// Fields that passed request validation, checked against the schema
/// constraints right before insert.
#[derive(Debug, Clone, Validate)]
pub struct NewQuestion {
    #[validate(length(min = 1, message = "Question text is required"))]
    pub question_text: String,

    #[validate(length(
        min = 4,
        max = 4,
        message = "A question must have exactly 4 options"
    ))]
    pub options: Vec<String>,

    #[validate(length(min = 1, message = "Correct answer is required"))]
    pub correct_answer: String,

    pub explanation: Option<String>,

    pub category_id: ObjectId,
}

impl NewQuestion {
    pub fn into_question(self) -> Question {
        let now = Utc::now();
        Question {
            id: None,
            question_text: self.question_text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            category_id: self.category_id,
            flags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` means the field was absent from the request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionPatch {
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub category_id: Option<ObjectId>,
}

impl QuestionPatch {
    pub fn is_empty(&self) -> bool {
        *self == QuestionPatch::default()
    }

    /// Applies the fields that differ from `question` and returns their
    /// stored names. Timestamps are left alone.
    pub fn apply_to(&self, question: &mut Question) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(text) = &self.question_text {
            if *text != question.question_text {
                question.question_text = text.clone();
                changed.push("questionText");
            }
        }

        if let Some(options) = &self.options {
            if *options != question.options {
                question.options = options.clone();
                changed.push("options");
            }
        }

        if let Some(answer) = &self.correct_answer {
            if *answer != question.correct_answer {
                question.correct_answer = answer.clone();
                changed.push("correctAnswer");
            }
        }

        if let Some(explanation) = &self.explanation {
            if question.explanation.as_ref() != Some(explanation) {
                question.explanation = Some(explanation.clone());
                changed.push("explanation");
            }
        }

        if let Some(category_id) = self.category_id {
            if category_id != question.category_id {
                question.category_id = category_id;
                changed.push("categoryId");
            }
        }

        changed
    }
}
