use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::handlers::ApiError;

/// JSON extractor whose rejections use the API's `{message}` error body
/// instead of axum's plain-text default
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = describe_rejection(&rejection);
                tracing::warn!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::bad_request(message))
            }
        }
    }
}

fn describe_rejection(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => {
            format!("Malformed JSON body: {}", rejection.body_text())
        }
        _ => format!("Failed to parse JSON request body: {}", rejection.body_text()),
    }
}
