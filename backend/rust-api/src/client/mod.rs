//! HTTP client for the quiz API, used by the terminal runner.

pub mod store;

use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::{CategoryResponse, QuestionResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const NO_CHANGE_MESSAGE: &str = "No fields were updated";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer. `body` keeps the full JSON error (`missing`,
    /// `invalidParams`, bulk `errors`).
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: Value,
    },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result of a PATCH: the updated record, or the server's "nothing changed"
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    Updated(T),
    NoChange,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        read_json(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        read_json(response).await
    }

    async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        let response = self.http.patch(self.url(path)).json(body).send().await?;
        read_json(response).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        let response = self.http.delete(self.url(path)).send().await?;
        read_json(response).await
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<CategoryResponse>, ClientError> {
        self.get("/categories").await
    }

    pub async fn get_category(&self, id: &str) -> Result<CategoryResponse, ClientError> {
        self.get(&format!("/categories/{}", id)).await
    }

    pub async fn create_category<B: Serialize + ?Sized>(
        &self,
        category: &B,
    ) -> Result<CategoryResponse, ClientError> {
        let body = self.post("/categories", category).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn create_categories<B: Serialize>(
        &self,
        categories: &[B],
    ) -> Result<Vec<CategoryResponse>, ClientError> {
        let body = self
            .post("/categories/bulk", &json!({ "categories": categories }))
            .await?;
        field(body, "categories")
    }

    pub async fn update_category<B: Serialize + ?Sized>(
        &self,
        id: &str,
        patch: &B,
    ) -> Result<UpdateOutcome<CategoryResponse>, ClientError> {
        let body = self.patch(&format!("/categories/{}", id), patch).await?;
        update_outcome(body)
    }

    pub async fn delete_category(&self, id: &str) -> Result<CategoryResponse, ClientError> {
        let body = self.delete(&format!("/categories/{}", id)).await?;
        field(body, "deletedCategory")
    }

    /// Returns how many categories were removed
    pub async fn delete_all_categories(&self) -> Result<u64, ClientError> {
        let body = self.delete("/categories").await?;
        field(body, "deletedCount")
    }

    // Questions

    pub async fn list_questions(&self) -> Result<Vec<QuestionResponse>, ClientError> {
        self.get("/questions").await
    }

    pub async fn random_questions(&self, count: usize) -> Result<Vec<QuestionResponse>, ClientError> {
        self.get(&format!("/questions/random/{}", count)).await
    }

    pub async fn get_question(&self, id: &str) -> Result<QuestionResponse, ClientError> {
        self.get(&format!("/questions/{}", id)).await
    }

    pub async fn create_question<B: Serialize + ?Sized>(
        &self,
        question: &B,
    ) -> Result<QuestionResponse, ClientError> {
        let body = self.post("/questions", question).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn create_questions<B: Serialize>(
        &self,
        questions: &[B],
    ) -> Result<Vec<QuestionResponse>, ClientError> {
        let body = self
            .post("/questions/bulk", &json!({ "questions": questions }))
            .await?;
        field(body, "questions")
    }

    pub async fn update_question<B: Serialize + ?Sized>(
        &self,
        id: &str,
        patch: &B,
    ) -> Result<UpdateOutcome<QuestionResponse>, ClientError> {
        let body = self.patch(&format!("/questions/{}", id), patch).await?;
        update_outcome(body)
    }

    pub async fn delete_question(&self, id: &str) -> Result<QuestionResponse, ClientError> {
        let body = self.delete(&format!("/questions/{}", id)).await?;
        field(body, "deletedQuestion")
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Err(api_error(status, body))
}

fn api_error(status: StatusCode, body: Value) -> ClientError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| status.canonical_reason())
        .unwrap_or("Request failed")
        .to_string();

    ClientError::Api {
        status: status.as_u16(),
        message,
        body,
    }
}

fn field<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, ClientError> {
    let value = body.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    Ok(serde_json::from_value(value)?)
}

fn update_outcome<T: DeserializeOwned>(body: Value) -> Result<UpdateOutcome<T>, ClientError> {
    let unchanged = body.get("id").is_none()
        && body.get("message").and_then(Value::as_str) == Some(NO_CHANGE_MESSAGE);

    if unchanged {
        Ok(UpdateOutcome::NoChange)
    } else {
        Ok(UpdateOutcome::Updated(serde_json::from_value(body)?))
    }
}
