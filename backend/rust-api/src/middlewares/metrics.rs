use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Label for requests that hit the fallback
const UNMATCHED_PATH: &str = "unmatched";

/// Records request count and latency per method, route template and status
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = route_label(req.extensions().get::<MatchedPath>());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// The route template, so ids and counts never become label values
fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string())
}
