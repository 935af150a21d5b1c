use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::services::{BulkEntity, ServiceError};
use crate::validation::FieldError;

#[derive(Debug)]
pub enum ApiError {
    /// 400 with a prepared JSON body (`message` plus `missing` / `invalidParams` / `errors`)
    BadRequest(Value),
    NotFound(String),
    /// 500; the underlying error text is passed through to the client
    Internal { message: String, error: String },
    NotImplemented(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(json!({ "message": message.into() }))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>, error: impl ToString) -> Self {
        ApiError::Internal {
            message: message.into(),
            error: error.to_string(),
        }
    }
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        ApiError::BadRequest(err.body)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(field_error) => field_error.into(),
            ServiceError::NotFound(entity) => ApiError::not_found(format!("{} not found", entity)),
            ServiceError::Store { context, source } => ApiError::internal(context, source),
            // categories report `length`, questions do not
            ServiceError::Rejected { entity, errors } => ApiError::BadRequest(match entity {
                BulkEntity::Category => json!({
                    "message": "Some categories could not be created",
                    "length": errors.len(),
                    "errors": errors,
                }),
                BulkEntity::Question => json!({
                    "message": "Some questions could not be created",
                    "errors": errors,
                }),
            }),
            ServiceError::Unexpected(message) => {
                ApiError::internal("Unexpected error during bulk creation", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(body) => (StatusCode::BAD_REQUEST, body),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            ApiError::Internal { message, error } => {
                tracing::error!("{}: {}", message, error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": message, "error": error }),
                )
            }
            ApiError::NotImplemented(message) => {
                (StatusCode::NOT_IMPLEMENTED, json!({ "message": message }))
            }
        };
        (status, Json(body)).into_response()
    }
}
