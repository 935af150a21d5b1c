use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub mod client;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod validation;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/categories", category_routes())
        .nest("/questions", question_routes())
        .fallback(handlers::route_not_found)
        .with_state(app_state)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(middlewares::metrics::metrics_middleware))
        .layer(middleware::from_fn(middlewares::trace::trace_context_middleware))
        .layer(middleware::from_fn(middlewares::cors::preflight_middleware))
        .layer(middlewares::cors::cors_layer())
}

fn category_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::categories::list_categories)
                .post(handlers::categories::create_category)
                .delete(handlers::categories::delete_all_categories),
        )
        .route("/bulk", post(handlers::categories::create_categories_bulk))
        .route("/csv", post(handlers::csv_import_not_implemented))
        .route(
            "/{id}",
            get(handlers::categories::get_category)
                .patch(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
}

fn question_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::questions::list_questions).post(handlers::questions::create_question),
        )
        .route("/bulk", post(handlers::questions::create_questions_bulk))
        .route("/csv", post(handlers::csv_import_not_implemented))
        .route(
            "/random/{n}",
            get(handlers::questions::random_questions),
        )
        .route(
            "/{id}",
            get(handlers::questions::get_question)
                .patch(handlers::questions::update_question)
                .delete(handlers::questions::delete_question),
        )
}
