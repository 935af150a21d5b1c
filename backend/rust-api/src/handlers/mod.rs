use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

pub mod categories;
pub mod error;
pub mod questions;

pub use error::ApiError;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mongo_health = check_mongodb(&state).await;
    let healthy = mongo_health.get("status").and_then(|v| v.as_str()) == Some("healthy");

    let (status_code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "quiz-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": { "mongodb": mongo_health }
        })),
    )
}

async fn check_mongodb(state: &AppState) -> serde_json::Map<String, Value> {
    let mut result = serde_json::Map::new();

    match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.mongo.run_command(mongodb::bson::doc! { "ping": 1 }),
    )
    .await
    {
        Ok(Ok(_)) => {
            result.insert("status".to_string(), json!("healthy"));
            result.insert(
                "message".to_string(),
                json!("MongoDB connection successful"),
            );
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("MongoDB error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("MongoDB timeout after 1s"));
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Multipart CSV import is routed but not supported
pub async fn csv_import_not_implemented() -> ApiError {
    ApiError::NotImplemented("CSV import is not implemented".to_string())
}

/// Last-resort JSON body for a handler that panicked
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::internal("Internal server error", detail).into_response()
}

/// Pulls the record array out of a bulk body such as `{"categories": [...]}`
pub(crate) fn bulk_records<'a>(
    body: &'a Value,
    key: &str,
    label: &str,
) -> Result<&'a [Value], ApiError> {
    match body.get(key).and_then(Value::as_array) {
        Some(records) if !records.is_empty() => Ok(records.as_slice()),
        _ => Err(ApiError::BadRequest(json!({
            "message": format!("{} must be a non-empty array", label),
            "invalidParams": body.get(key).cloned().unwrap_or(Value::Null),
        }))),
    }
}
