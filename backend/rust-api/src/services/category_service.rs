use crate::metrics::track_db_operation;
use crate::models::category::CATEGORIES_COLLECTION;
use crate::models::{Category, CategoryResponse, NewCategory};
use crate::services::{
    changed_fields, parse_object_id, store_error, BulkEntity, BulkTransaction, ServiceError,
    UpdateOutcome,
};
use crate::validation::{
    check_new_category, duplicate_name, validate_category_patch, validate_new_category, FieldError,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{ClientSession, Collection, Database};
use serde_json::Value;
use std::collections::HashSet;
use validator::Validate;

const ENTITY: &str = "Category";

pub struct CategoryService {
    mongo: Database,
}

impl CategoryService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<Category> {
        self.mongo.collection(CATEGORIES_COLLECTION)
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        let collection = self.collection();
        let categories = track_db_operation("find", CATEGORIES_COLLECTION, async {
            collection
                .find(doc! {})
                .await?
                .try_collect::<Vec<Category>>()
                .await
        })
        .await
        .map_err(store_error("Failed to load categories"))?;

        Ok(categories.into_iter().map(CategoryResponse::from).collect())
    }

    async fn find_category(&self, category_id: &str) -> Result<Category, ServiceError> {
        let object_id = parse_object_id(category_id, ENTITY)?;
        let collection = self.collection();

        let category = track_db_operation("find_one", CATEGORIES_COLLECTION, async {
            collection.find_one(doc! { "_id": object_id }).await
        })
        .await
        .map_err(store_error("Failed to query category"))?;

        category.ok_or(ServiceError::NotFound(ENTITY))
    }

    /// Inside a bulk import the read joins the open transaction
    async fn name_taken(
        &self,
        name: &str,
        session: Option<&mut ClientSession>,
    ) -> Result<bool, mongodb::error::Error> {
        let collection = self.collection();
        let filter = doc! { "name": name };

        let count = match session {
            Some(session) => collection.count_documents(filter).session(session).await?,
            None => {
                track_db_operation("count", CATEGORIES_COLLECTION, async {
                    collection.count_documents(filter).await
                })
                .await?
            }
        };

        Ok(count > 0)
    }

    pub async fn get_category(&self, category_id: &str) -> Result<CategoryResponse, ServiceError> {
        self.find_category(category_id).await.map(CategoryResponse::from)
    }

    pub async fn create_category(&self, body: &Value) -> Result<CategoryResponse, ServiceError> {
        let draft = validate_new_category(body)?;
        draft
            .validate()
            .map_err(|e| FieldError::from_validation_errors(&e))?;

        let mut category = draft.into_category();
        let collection = self.collection();

        // any rejection from the store (duplicate name included) is reported as a 400
        let insert_result = track_db_operation("insert_one", CATEGORIES_COLLECTION, async {
            collection.insert_one(&category).await
        })
        .await
        .map_err(|e| FieldError::validation_failure(e.to_string()))?;

        category.id = insert_result.inserted_id.as_object_id();

        tracing::info!(name = %category.name, "Category created");
        Ok(category.into())
    }

    /// Validates and writes every record, then commits all of them or none.
    /// Names are checked against the store and the rest of the batch so
    /// each duplicate is reported on its own record.
    pub async fn create_categories_bulk(
        &self,
        records: &[Value],
    ) -> Result<Vec<CategoryResponse>, ServiceError> {
        let collection = self.collection();
        let mut tx = BulkTransaction::open(self.mongo.client(), BulkEntity::Category).await?;
        let mut created = Vec::with_capacity(records.len());
        let mut batch_names = HashSet::new();

        for record in records {
            tx.track_record();

            let draft = match check_new_category(record) {
                Ok(draft) => draft,
                Err(errors) => {
                    for error in errors {
                        tx.reject(record, error);
                    }
                    continue;
                }
            };

            if let Err(e) = draft.validate() {
                tx.reject(record, FieldError::from_validation_errors(&e));
                continue;
            }

            if !batch_names.insert(draft.name.clone()) {
                tx.reject(record, duplicate_name(&draft.name));
                continue;
            }
            let taken = self.name_taken(&draft.name, tx.open_session()).await;
            match taken {
                Ok(false) => {}
                Ok(true) => {
                    tx.reject(record, duplicate_name(&draft.name));
                    continue;
                }
                Err(e) => return Err(tx.fail(ServiceError::Unexpected(e.to_string())).await),
            }

            let mut category = draft.into_category();
            match tx.insert(&collection, record, &category).await {
                Ok(Some(id)) => {
                    category.id = Some(id);
                    created.push(CategoryResponse::from(category));
                }
                Ok(None) => {}
                Err(e) => return Err(tx.fail(e).await),
            }
        }

        tx.finish(created).await
    }

    /// Applies only the fields that differ; `updatedAt` moves only then
    pub async fn update_category(
        &self,
        category_id: &str,
        body: &Value,
    ) -> Result<UpdateOutcome<CategoryResponse>, ServiceError> {
        let mut category = self.find_category(category_id).await?;
        let patch = validate_category_patch(body)?;

        let changed = patch.apply_to(&mut category);
        if changed.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }

        NewCategory {
            name: category.name.clone(),
            description: category.description.clone(),
            language: category.language,
        }
        .validate()
        .map_err(|e| FieldError::from_validation_errors(&e))?;

        category.touch();
        let set = changed_fields(&category, &changed)?;
        let collection = self.collection();

        track_db_operation("update_one", CATEGORIES_COLLECTION, async {
            collection
                .update_one(doc! { "_id": category.id }, doc! { "$set": set })
                .await
        })
        .await
        .map_err(|e| FieldError::validation_failure(e.to_string()))?;

        tracing::info!(category_id, fields = ?changed, "Category updated");
        Ok(UpdateOutcome::Updated(category.into()))
    }

    /// Returns the deleted snapshot
    pub async fn delete_category(&self, category_id: &str) -> Result<CategoryResponse, ServiceError> {
        let category = self.find_category(category_id).await?;
        let collection = self.collection();

        track_db_operation("delete_one", CATEGORIES_COLLECTION, async {
            collection.delete_one(doc! { "_id": category.id }).await
        })
        .await
        .map_err(store_error("Failed to delete category"))?;

        tracing::info!(category_id, "Category deleted");
        Ok(category.into())
    }

    pub async fn delete_all_categories(&self) -> Result<u64, ServiceError> {
        let collection = self.collection();
        let result = track_db_operation("delete_many", CATEGORIES_COLLECTION, async {
            collection.delete_many(doc! {}).await
        })
        .await
        .map_err(store_error("Failed to delete categories"))?;

        tracing::warn!(deleted = result.deleted_count, "All categories deleted");
        Ok(result.deleted_count)
    }
}
