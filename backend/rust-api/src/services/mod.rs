use crate::config::Config;
use crate::models::{
    category::CATEGORIES_COLLECTION,
    question::QUESTIONS_COLLECTION,
    user::{User, USERS_COLLECTION},
    Category, Question,
};
use crate::validation::FieldError;
use anyhow::Context;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind as MongoErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Database, IndexModel};
use serde::Serialize;

pub mod bulk;
pub mod category_service;
pub mod question_service;

pub use bulk::{BulkEntity, BulkTransaction, RecordError};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
}

impl AppState {
    pub fn new(config: Config, mongo_client: MongoClient) -> Self {
        let mongo = mongo_client.database(&config.mongo_database);
        Self { config, mongo }
    }

    /// Unique indexes backing `Category.name`, `User.username` and `User.email`
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.mongo
            .collection::<Category>(CATEGORIES_COLLECTION)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .context("Failed to create categories.name index")?;

        self.mongo
            .collection::<Question>(QUESTIONS_COLLECTION)
            .create_index(IndexModel::builder().keys(doc! { "categoryId": 1 }).build())
            .await
            .context("Failed to create questions.categoryId index")?;

        let users = self.mongo.collection::<User>(USERS_COLLECTION);
        for key in ["username", "email"] {
            let mut keys = Document::new();
            keys.insert(key, 1);
            users
                .create_index(IndexModel::builder().keys(keys).options(unique()).build())
                .await
                .with_context(|| format!("Failed to create users.{} index", key))?;
        }

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Request rejected by a field rule (400)
    #[error(transparent)]
    Invalid(#[from] FieldError),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The store failed on a read or delete (500)
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: mongodb::error::Error,
    },

    /// Bulk import aborted; every failing record is listed
    #[error("{} {} records rejected", .errors.len(), .entity.as_str())]
    Rejected {
        entity: BulkEntity,
        errors: Vec<RecordError>,
    },

    /// Anything else while a bulk transaction was open
    #[error("{0}")]
    Unexpected(String),
}

/// `map_err` adapter for driver errors
pub(crate) fn store_error(context: &'static str) -> impl FnOnce(mongodb::error::Error) -> ServiceError {
    move |source| ServiceError::Store { context, source }
}

/// Outcome of a PATCH: nothing changed is not an error
#[derive(Debug)]
pub enum UpdateOutcome<T> {
    Updated(T),
    Unchanged,
}

/// Ids that do not parse can never match a document
pub(crate) fn parse_object_id(id: &str, entity: &'static str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(id).map_err(|_| ServiceError::NotFound(entity))
}

/// Write errors reported by the server for a single document
/// (duplicate key, document validation)
pub(crate) fn is_write_error(err: &mongodb::error::Error) -> bool {
    matches!(*err.kind, MongoErrorKind::Write(WriteFailure::WriteError(_)))
}

/// `$set` body holding the changed fields plus `updatedAt`
pub(crate) fn changed_fields<T: Serialize>(
    entity: &T,
    changed: &[&str],
) -> Result<Document, ServiceError> {
    let full = mongodb::bson::to_document(entity)
        .map_err(|e| ServiceError::Unexpected(format!("Failed to serialize update: {}", e)))?;

    let mut set = Document::new();
    for key in changed.iter().copied().chain(std::iter::once("updatedAt")) {
        if let Some(value) = full.get(key) {
            set.insert(key, value.clone());
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, NewCategory};

    #[test]
    fn test_changed_fields_always_carries_updated_at() {
        let category = NewCategory {
            name: "Science".to_string(),
            description: "Physics".to_string(),
            language: Language::Eng,
        }
        .into_category();

        let set = changed_fields(&category, &["description"]).unwrap();
        let keys: Vec<&str> = set.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["description", "updatedAt"]);
        assert_eq!(set.get_str("description").unwrap(), "Physics");
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        assert!(matches!(
            parse_object_id("123", "Category"),
            Err(ServiceError::NotFound("Category"))
        ));
        assert!(parse_object_id(&ObjectId::new().to_hex(), "Category").is_ok());
    }
}
