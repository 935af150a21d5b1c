#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use mongodb::bson::{doc, Document};
use mongodb::Database;
use quiz_api::{config::Config, create_router, services::AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

async fn build_state() -> Arc<AppState> {
    init_tracing();
    dotenvy::from_filename(".env.test").ok();

    let config = Config::load().expect("Failed to load test configuration");

    // The driver connects lazily, so requests rejected before any query
    // work without a running server
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to create test MongoDB client");

    Arc::new(AppState::new(config, mongo_client))
}

/// Router for requests that never reach the database
pub async fn create_test_app() -> Router {
    create_router(build_state().await)
}

/// Router plus a handle to a freshly emptied test database. Needs a
/// MongoDB replica set (transactions) at the configured URI.
pub async fn create_db_test_app() -> (Router, Database) {
    let state = build_state().await;
    let db = state.mongo.clone();

    for collection in ["categories", "questions"] {
        db.collection::<Document>(collection)
            .delete_many(doc! {})
            .await
            .expect("Failed to clear test collection");
    }
    state
        .ensure_indexes()
        .await
        .expect("Failed to create test indexes");

    (create_router(state), db)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

pub async fn count(db: &Database, collection: &str) -> u64 {
    db.collection::<Document>(collection)
        .count_documents(doc! {})
        .await
        .unwrap()
}
