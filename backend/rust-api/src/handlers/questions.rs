use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    handlers::{bulk_records, ApiError},
    services::{question_service::QuestionService, AppState, UpdateOutcome},
    validation::parse_question_count,
};

/// GET /questions
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuestionService::new(state.mongo.clone());
    let questions = service.list_questions().await?;

    Ok(Json(questions))
}

/// GET /questions/random/{n}
pub async fn random_questions(
    State(state): State<Arc<AppState>>,
    Path(count): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let count = parse_question_count(&count)?;

    let service = QuestionService::new(state.mongo.clone());
    let questions = service.random_questions(count).await?;

    Ok(Json(questions))
}

/// GET /questions/{id}
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuestionService::new(state.mongo.clone());
    let question = service.get_question(&question_id).await?;

    Ok(Json(question))
}

/// POST /questions
pub async fn create_question(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuestionService::new(state.mongo.clone());
    let question = service.create_question(&body).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// POST /questions/bulk
pub async fn create_questions_bulk(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let records = bulk_records(&body, "questions", "Questions")?;

    let service = QuestionService::new(state.mongo.clone());
    let questions = service.create_questions_bulk(records).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Questions created successfully",
            "questions": questions,
        })),
    ))
}

/// PATCH /questions/{id}
pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
    AppJson(body): AppJson<Value>,
) -> Result<Response, ApiError> {
    let service = QuestionService::new(state.mongo.clone());

    let response = match service.update_question(&question_id, &body).await? {
        UpdateOutcome::Updated(question) => Json(question).into_response(),
        UpdateOutcome::Unchanged => {
            Json(json!({ "message": "No fields were updated" })).into_response()
        }
    };

    Ok(response)
}

/// DELETE /questions/{id}
pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuestionService::new(state.mongo.clone());
    let deleted = service.delete_question(&question_id).await?;

    Ok(Json(json!({
        "message": "Question deleted successfully",
        "deletedQuestion": deleted,
    })))
}
