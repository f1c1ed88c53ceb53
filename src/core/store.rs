//! Data accessor trait implemented by storage backends

use crate::core::error::FieldValidationError;
use crate::core::query::ListQuery;
use crate::core::record::{Record, RecordId};
use async_trait::async_trait;

/// Failures a data store can report
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record '{id}' not found")]
    NotFound { id: RecordId },

    #[error("record '{id}' already exists")]
    AlreadyExists { id: RecordId },

    #[error("schema validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldValidationError>),

    #[error("{backend} is unavailable: {message}")]
    Unavailable { backend: String, message: String },

    #[error("{backend} query failed: {message}")]
    Query { backend: String, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for the records of one model
///
/// The routes never cache records: every request goes through the store.
/// Implementations own identity assignment, schema validation and their
/// own concurrency control.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Short backend name used in logs and errors
    fn backend(&self) -> &'static str;

    /// Name of the field holding the record id
    fn id_field(&self) -> &str;

    /// Persist a new record and return it as stored
    ///
    /// A record without an id gets one assigned by the store.
    async fn create(&self, record: Record) -> StoreResult<Record>;

    /// Fetch a record by id, `None` if absent
    async fn find_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Fetch the records matching a list query
    async fn find(&self, query: &ListQuery) -> StoreResult<Vec<Record>>;

    /// Count the records matching a list query, ignoring skip and limit
    async fn count(&self, query: &ListQuery) -> StoreResult<usize>;

    /// Merge `patch` into the stored record and return the result
    ///
    /// Fails with [`StoreError::NotFound`] if the id is absent.
    async fn update_by_id(&self, id: &RecordId, patch: Record) -> StoreResult<Record>;

    /// Remove a record and return it
    ///
    /// Fails with [`StoreError::NotFound`] if the id is absent.
    async fn delete_by_id(&self, id: &RecordId) -> StoreResult<Record>;

    /// Check that the backend is reachable
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
