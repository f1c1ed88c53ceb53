//! In-memory implementation of DataStore for testing and development

use crate::core::error::FieldValidationError;
use crate::core::query::ListQuery;
use crate::core::record::{DEFAULT_ID_FIELD, Record, RecordId, with_leading_id};
use crate::core::schema::Schema;
use crate::core::store::{DataStore, StoreError, StoreResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const BACKEND: &str = "memory";

/// In-memory record store
///
/// Records are kept in insertion order behind a `RwLock`. Records created
/// without an id get the highest integer id plus one (`1` for the first).
#[derive(Clone)]
pub struct InMemoryStore {
    records: Arc<RwLock<IndexMap<RecordId, Record>>>,
    schema: Arc<Schema>,
    id_field: Arc<str>,
}

impl InMemoryStore {
    /// Create an empty store with no schema and `_id` as id field
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(IndexMap::new())),
            schema: Arc::new(Schema::new()),
            id_field: Arc::from(DEFAULT_ID_FIELD),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_id_field(mut self, id_field: &str) -> Self {
        self.id_field = Arc::from(id_field);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, IndexMap<RecordId, Record>>> {
        self.records.read().map_err(|e| StoreError::Query {
            backend: BACKEND.to_string(),
            message: format!("Failed to acquire read lock: {}", e),
        })
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, IndexMap<RecordId, Record>>> {
        self.records.write().map_err(|e| StoreError::Query {
            backend: BACKEND.to_string(),
            message: format!("Failed to acquire write lock: {}", e),
        })
    }

    /// Next auto-assigned id: one past the largest integer id, starting at 1
    fn next_id(&self, records: &IndexMap<RecordId, Record>) -> StoreResult<RecordId> {
        match records.keys().filter_map(RecordId::as_int).max() {
            None => Ok(RecordId::Int(1)),
            Some(max) => max.checked_add(1).map(RecordId::Int).ok_or_else(|| {
                StoreError::Validation(vec![FieldValidationError {
                    field: self.id_field.to_string(),
                    message: format!("cannot be assigned after {}, provide one explicitly", max),
                }])
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn id_field(&self) -> &str {
        &self.id_field
    }

    async fn create(&self, record: Record) -> StoreResult<Record> {
        self.schema
            .validate(&record, &self.id_field)
            .map_err(StoreError::Validation)?;

        let mut records = self.write()?;

        let id = match record.get(&*self.id_field) {
            None | Some(serde_json::Value::Null) => self.next_id(&records)?,
            Some(value) => RecordId::from_value(value).ok_or_else(|| {
                StoreError::Validation(vec![FieldValidationError {
                    field: self.id_field.to_string(),
                    message: "must be an integer or a non-numeric string".to_string(),
                }])
            })?,
        };

        if records.contains_key(&id) {
            return Err(StoreError::AlreadyExists { id });
        }

        let stored = with_leading_id(record, &self.id_field, &id);
        records.insert(id, stored.clone());

        Ok(stored)
    }

    async fn find_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn find(&self, query: &ListQuery) -> StoreResult<Vec<Record>> {
        let records = self.read()?;
        Ok(query.apply(records.values().cloned()))
    }

    async fn count(&self, query: &ListQuery) -> StoreResult<usize> {
        let records = self.read()?;
        Ok(records.values().filter(|r| query.matches(r)).count())
    }

    async fn update_by_id(&self, id: &RecordId, patch: Record) -> StoreResult<Record> {
        let mut records = self.write()?;

        let current = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;

        let mut merged = current.clone();
        for (field, value) in patch {
            if field != *self.id_field {
                merged.insert(field, value);
            }
        }

        self.schema
            .validate(&merged, &self.id_field)
            .map_err(StoreError::Validation)?;

        records.insert(id.clone(), merged.clone());

        Ok(merged)
    }

    async fn delete_by_id(&self, id: &RecordId) -> StoreResult<Record> {
        self.write()?
            .shift_remove(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }
}
