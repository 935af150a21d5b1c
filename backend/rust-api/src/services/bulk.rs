//! All-or-nothing bulk inserts.
//!
//! Lifecycle: `TransactionOpen -> [WriteFailed ->] Committed | Aborted`,
//! and the session is closed when the `BulkTransaction` is dropped.
//! Dropping a session with a transaction still in progress aborts it server
//! side, so early returns never leave partial writes behind.
//!
//! Every record is validated and written even after a rejection, so each
//! failing record gets its own entry. A server-side write error rolls the
//! transaction back; from then on records are only validated.

use mongodb::bson::oid::ObjectId;
use mongodb::{Client, ClientSession, Collection};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use super::{is_write_error, ServiceError};
use crate::metrics::{BULK_IMPORTS_TOTAL, BULK_IMPORT_RECORDS};
use crate::validation::{ErrorKind, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkEntity {
    Category,
    Question,
}

impl BulkEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            BulkEntity::Category => "category",
            BulkEntity::Question => "question",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkPhase {
    TransactionOpen,
    /// The server rolled the transaction back after a write error
    WriteFailed,
    Committed,
    Aborted,
}

/// One rejected input record, as reported to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    pub record: Value,
    pub error_kind: ErrorKind,
    pub details: Value,
}

impl RecordError {
    pub fn new(record: &Value, error: FieldError) -> Self {
        Self {
            record: record.clone(),
            error_kind: error.kind,
            details: error.body,
        }
    }
}

/// Collects per-record rejections independently of the store so the
/// commit decision can be reasoned about on its own.
#[derive(Debug, Default)]
pub struct BulkReport {
    errors: Vec<RecordError>,
}

impl BulkReport {
    pub fn reject(&mut self, record: &Value, error: FieldError) {
        self.errors.push(RecordError::new(record, error));
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(created)` when nothing was rejected
    pub fn into_result<T>(
        self,
        entity: BulkEntity,
        created: Vec<T>,
    ) -> Result<Vec<T>, ServiceError> {
        if self.errors.is_empty() {
            Ok(created)
        } else {
            Err(ServiceError::Rejected {
                entity,
                errors: self.errors,
            })
        }
    }
}

pub struct BulkTransaction {
    entity: BulkEntity,
    session: ClientSession,
    phase: BulkPhase,
    report: BulkReport,
    records: usize,
    started: Instant,
}

impl BulkTransaction {
    pub async fn open(client: &Client, entity: BulkEntity) -> Result<Self, ServiceError> {
        let mut session = client
            .start_session()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Failed to start session: {}", e)))?;

        session
            .start_transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Failed to start transaction: {}", e)))?;

        tracing::debug!(entity = entity.as_str(), "Bulk transaction opened");

        Ok(Self {
            entity,
            session,
            phase: BulkPhase::TransactionOpen,
            report: BulkReport::default(),
            records: 0,
            started: Instant::now(),
        })
    }

    /// The session while its transaction still accepts operations.
    /// Reads fall back to committed data once a write has failed.
    pub fn open_session(&mut self) -> Option<&mut ClientSession> {
        match self.phase {
            BulkPhase::TransactionOpen => Some(&mut self.session),
            _ => None,
        }
    }

    pub fn reject(&mut self, record: &Value, error: FieldError) {
        tracing::debug!(
            entity = self.entity.as_str(),
            kind = ?error.kind,
            "Bulk record rejected: {}",
            error.message
        );
        self.report.reject(record, error);
    }

    /// Counts an input record towards the import size metric
    pub fn track_record(&mut self) {
        self.records += 1;
    }

    /// Inserts inside the transaction. A server-side write error rejects
    /// the record and yields `Ok(None)`; anything else is unexpected. Once
    /// a write has failed nothing more is sent.
    pub async fn insert<T>(
        &mut self,
        collection: &Collection<T>,
        record: &Value,
        document: &T,
    ) -> Result<Option<ObjectId>, ServiceError>
    where
        T: Serialize + Send + Sync,
    {
        if self.phase != BulkPhase::TransactionOpen {
            return Ok(None);
        }

        let result = collection
            .insert_one(document)
            .session(&mut self.session)
            .await;

        match result {
            Ok(result) => result.inserted_id.as_object_id().map(Some).ok_or_else(|| {
                ServiceError::Unexpected("Inserted id is not an ObjectId".to_string())
            }),
            Err(e) if is_write_error(&e) => {
                self.reject(record, FieldError::validation_failure(e.to_string()));
                self.phase = BulkPhase::WriteFailed;
                Ok(None)
            }
            Err(e) => Err(ServiceError::Unexpected(e.to_string())),
        }
    }

    /// Commits when no record was rejected, aborts otherwise
    pub async fn finish<T>(mut self, created: Vec<T>) -> Result<Vec<T>, ServiceError> {
        if self.report.is_clean() {
            let committed = self.session.commit_transaction().await;
            if let Err(e) = committed {
                return Err(self.fail(ServiceError::Unexpected(e.to_string())).await);
            }
            self.phase = BulkPhase::Committed;
            self.record_outcome("committed");
            tracing::info!(
                entity = self.entity.as_str(),
                count = created.len(),
                "Bulk import committed"
            );
        } else {
            if let Err(e) = self.session.abort_transaction().await {
                tracing::warn!(
                    entity = self.entity.as_str(),
                    "Failed to abort transaction: {}",
                    e
                );
            }
            self.phase = BulkPhase::Aborted;
            self.record_outcome("rejected");
            tracing::info!(
                entity = self.entity.as_str(),
                errors = self.report.len(),
                "Bulk import aborted, records rejected"
            );
        }

        let report = std::mem::take(&mut self.report);
        report.into_result(self.entity, created)
    }

    /// Aborts after an unexpected failure and hands the error back
    pub async fn fail(mut self, error: ServiceError) -> ServiceError {
        if self.phase != BulkPhase::Committed {
            if let Err(e) = self.session.abort_transaction().await {
                tracing::warn!(
                    entity = self.entity.as_str(),
                    "Failed to abort transaction: {}",
                    e
                );
            }
        }
        self.phase = BulkPhase::Aborted;
        self.record_outcome("failed");
        tracing::error!(entity = self.entity.as_str(), "Bulk import failed: {}", error);

        match error {
            ServiceError::Unexpected(message) => ServiceError::Unexpected(message),
            other => ServiceError::Unexpected(other.to_string()),
        }
    }

    fn record_outcome(&self, outcome: &str) {
        BULK_IMPORTS_TOTAL
            .with_label_values(&[self.entity.as_str(), outcome])
            .inc();
        BULK_IMPORT_RECORDS
            .with_label_values(&[self.entity.as_str()])
            .observe(self.records as f64);
        tracing::debug!(
            entity = self.entity.as_str(),
            outcome,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Bulk session closing"
        );
    }
}
