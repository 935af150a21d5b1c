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
    services::{category_service::CategoryService, AppState, UpdateOutcome},
};

/// GET /categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CategoryService::new(state.mongo.clone());
    let categories = service.list_categories().await?;

    Ok(Json(categories))
}

/// GET /categories/{id}
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CategoryService::new(state.mongo.clone());
    let category = service.get_category(&category_id).await?;

    Ok(Json(category))
}

/// POST /categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CategoryService::new(state.mongo.clone());
    let category = service.create_category(&body).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// POST /categories/bulk
pub async fn create_categories_bulk(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let records = bulk_records(&body, "categories", "Categories")?;

    let service = CategoryService::new(state.mongo.clone());
    let categories = service.create_categories_bulk(records).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Categories created successfully",
            "categories": categories,
        })),
    ))
}

/// PATCH /categories/{id}
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
    AppJson(body): AppJson<Value>,
) -> Result<Response, ApiError> {
    let service = CategoryService::new(state.mongo.clone());

    let response = match service.update_category(&category_id, &body).await? {
        UpdateOutcome::Updated(category) => Json(category).into_response(),
        UpdateOutcome::Unchanged => {
            Json(json!({ "message": "No fields were updated" })).into_response()
        }
    };

    Ok(response)
}

/// DELETE /categories/{id}
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CategoryService::new(state.mongo.clone());
    let deleted = service.delete_category(&category_id).await?;

    Ok(Json(json!({
        "message": "Category deleted successfully",
        "deletedCategory": deleted,
    })))
}

/// DELETE /categories
pub async fn delete_all_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CategoryService::new(state.mongo.clone());
    let deleted_count = service.delete_all_categories().await?;

    Ok(Json(json!({
        "message": "All categories deleted",
        "deletedCount": deleted_count,
    })))
}
