use crate::metrics::track_db_operation;
use crate::models::category::CATEGORIES_COLLECTION;
use crate::models::question::QUESTIONS_COLLECTION;
use crate::models::{Category, NewQuestion, Question, QuestionResponse};
use crate::services::{
    changed_fields, parse_object_id, store_error, BulkEntity, BulkTransaction, ServiceError,
    UpdateOutcome,
};
use crate::validation::{
    check_answer_in_options, validate_new_question, validate_question_patch, FieldError,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{ClientSession, Collection, Database};
use rand::seq::SliceRandom;
use serde_json::Value;
use validator::Validate;

const ENTITY: &str = "Question";

fn category_not_found(category_id: &ObjectId) -> FieldError {
    FieldError::invalid_reference("Category not found", &Value::String(category_id.to_hex()))
}

pub struct QuestionService {
    mongo: Database,
}

impl QuestionService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> Collection<Question> {
        self.mongo.collection(QUESTIONS_COLLECTION)
    }

    /// Explicit lookup standing in for a foreign key. Inside a bulk
    /// import the read joins the open transaction.
    async fn category_exists(
        &self,
        category_id: ObjectId,
        session: Option<&mut ClientSession>,
    ) -> Result<bool, mongodb::error::Error> {
        let categories = self.mongo.collection::<Category>(CATEGORIES_COLLECTION);
        let filter = doc! { "_id": category_id };

        let count = match session {
            Some(session) => categories.count_documents(filter).session(session).await?,
            None => {
                track_db_operation("count", CATEGORIES_COLLECTION, async {
                    categories.count_documents(filter).await
                })
                .await?
            }
        };

        Ok(count > 0)
    }

    async fn load_all(&self) -> Result<Vec<Question>, ServiceError> {
        let collection = self.collection();
        track_db_operation("find", QUESTIONS_COLLECTION, async {
            collection
                .find(doc! {})
                .await?
                .try_collect::<Vec<Question>>()
                .await
        })
        .await
        .map_err(store_error("Failed to load questions"))
    }

    pub async fn list_questions(&self) -> Result<Vec<QuestionResponse>, ServiceError> {
        let questions = self.load_all().await?;
        Ok(questions.into_iter().map(QuestionResponse::from).collect())
    }

    /// Shuffled sample of at most `count` questions. Order differs between
    /// calls; asking for more than exist returns all of them.
    pub async fn random_questions(&self, count: usize) -> Result<Vec<QuestionResponse>, ServiceError> {
        let mut questions = self.load_all().await?;
        questions.shuffle(&mut rand::rng());
        questions.truncate(count);

        tracing::debug!(requested = count, returned = questions.len(), "Random questions drawn");
        Ok(questions.into_iter().map(QuestionResponse::from).collect())
    }

    async fn find_question(&self, question_id: &str) -> Result<Question, ServiceError> {
        let object_id = parse_object_id(question_id, ENTITY)?;
        let collection = self.collection();

        let question = track_db_operation("find_one", QUESTIONS_COLLECTION, async {
            collection.find_one(doc! { "_id": object_id }).await
        })
        .await
        .map_err(store_error("Failed to query question"))?;

        question.ok_or(ServiceError::NotFound(ENTITY))
    }

    pub async fn get_question(&self, question_id: &str) -> Result<QuestionResponse, ServiceError> {
        self.find_question(question_id).await.map(QuestionResponse::from)
    }

    pub async fn create_question(&self, body: &Value) -> Result<QuestionResponse, ServiceError> {
        let draft = validate_new_question(body)?;
        draft
            .validate()
            .map_err(|e| FieldError::from_validation_errors(&e))?;

        let exists = self
            .category_exists(draft.category_id, None)
            .await
            .map_err(store_error("Failed to query category"))?;
        if !exists {
            return Err(category_not_found(&draft.category_id).into());
        }

        let mut question = draft.into_question();
        let collection = self.collection();

        let insert_result = track_db_operation("insert_one", QUESTIONS_COLLECTION, async {
            collection.insert_one(&question).await
        })
        .await
        .map_err(|e| FieldError::validation_failure(e.to_string()))?;

        question.id = insert_result.inserted_id.as_object_id();

        tracing::info!(category_id = %question.category_id, "Question created");
        Ok(question.into())
    }

    /// Same commit-or-abort flow as categories, but each record stops at
    /// its first failing rule.
    pub async fn create_questions_bulk(
        &self,
        records: &[Value],
    ) -> Result<Vec<QuestionResponse>, ServiceError> {
        let collection = self.collection();
        let mut tx = BulkTransaction::open(self.mongo.client(), BulkEntity::Question).await?;
        let mut created = Vec::with_capacity(records.len());

        for record in records {
            tx.track_record();

            let draft: NewQuestion = match validate_new_question(record) {
                Ok(draft) => draft,
                Err(error) => {
                    tx.reject(record, error);
                    continue;
                }
            };

            if let Err(e) = draft.validate() {
                tx.reject(record, FieldError::from_validation_errors(&e));
                continue;
            }

            let exists = self
                .category_exists(draft.category_id, tx.open_session())
                .await;
            match exists {
                Ok(true) => {}
                Ok(false) => {
                    tx.reject(record, category_not_found(&draft.category_id));
                    continue;
                }
                Err(e) => return Err(tx.fail(ServiceError::Unexpected(e.to_string())).await),
            }

            let mut question = draft.into_question();
            match tx.insert(&collection, record, &question).await {
                Ok(Some(id)) => {
                    question.id = Some(id);
                    created.push(QuestionResponse::from(question));
                }
                Ok(None) => {}
                Err(e) => return Err(tx.fail(e).await),
            }
        }

        tx.finish(created).await
    }

    /// Applies only the fields that differ; `updatedAt` moves only then.
    /// New options or a new answer must stay consistent with whatever is
    /// kept from the stored record.
    pub async fn update_question(
        &self,
        question_id: &str,
        body: &Value,
    ) -> Result<UpdateOutcome<QuestionResponse>, ServiceError> {
        let mut question = self.find_question(question_id).await?;
        let patch = validate_question_patch(body)?;

        if patch.options.is_some() || patch.correct_answer.is_some() {
            let options = patch.options.as_ref().unwrap_or(&question.options);
            let answer = patch
                .correct_answer
                .as_deref()
                .unwrap_or(&question.correct_answer);
            check_answer_in_options(options, answer)?;
        }

        if let Some(category_id) = patch.category_id {
            let exists = self
                .category_exists(category_id, None)
                .await
                .map_err(store_error("Failed to query category"))?;
            if !exists {
                return Err(category_not_found(&category_id).into());
            }
        }

        let changed = patch.apply_to(&mut question);
        if changed.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }

        NewQuestion {
            question_text: question.question_text.clone(),
            options: question.options.clone(),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            category_id: question.category_id,
        }
        .validate()
        .map_err(|e| FieldError::from_validation_errors(&e))?;

        question.touch();
        let set = changed_fields(&question, &changed)?;
        let collection = self.collection();

        track_db_operation("update_one", QUESTIONS_COLLECTION, async {
            collection
                .update_one(doc! { "_id": question.id }, doc! { "$set": set })
                .await
        })
        .await
        .map_err(|e| FieldError::validation_failure(e.to_string()))?;

        tracing::info!(question_id, fields = ?changed, "Question updated");
        Ok(UpdateOutcome::Updated(question.into()))
    }

    /// Returns the full deleted record, flags included
    pub async fn delete_question(&self, question_id: &str) -> Result<QuestionResponse, ServiceError> {
        let question = self.find_question(question_id).await?;
        let collection = self.collection();

        track_db_operation("delete_one", QUESTIONS_COLLECTION, async {
            collection.delete_one(doc! { "_id": question.id }).await
        })
        .await
        .map_err(store_error("Failed to delete question"))?;

        tracing::info!(question_id, "Question deleted");
        Ok(question.into())
    }
}
