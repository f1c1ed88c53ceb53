//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides `MongoStore`, a [`DataStore`] backed by one MongoDB collection.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! model-rest = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Storage model
//!
//! Records are stored as BSON documents, one collection per model. The
//! model's id field is mapped to MongoDB's `_id`. Records created without
//! an id get a fresh ObjectId rendered as a hex string.
//!
//! # Serialization strategy
//!
//! Records go through `serde_json::Value` and are converted to BSON with
//! `mongodb::bson::to_bson`; documents come back through relaxed extended
//! JSON so integers stay plain JSON numbers.

use crate::core::error::FieldValidationError;
use crate::core::query::{Comparison, ListQuery, SortDirection};
use crate::core::record::{DEFAULT_ID_FIELD, Record, RecordId, with_leading_id};
use crate::core::schema::Schema;
use crate::core::store::{DataStore, StoreError, StoreResult};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use std::sync::Arc;

const BACKEND: &str = "mongodb";
const DUPLICATE_KEY: i32 = 11000;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn query_error(context: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Query {
        backend: BACKEND.to_string(),
        message: format!("{}: {}", context, err),
    }
}

/// Classify a driver error
fn map_mongo_error(context: &str, err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            StoreError::Unavailable {
                backend: BACKEND.to_string(),
                message: format!("{}: {}", context, err),
            }
        }
        _ => query_error(context, err),
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

fn id_bson(id: &RecordId) -> Bson {
    match id {
        RecordId::Int(i) => Bson::Int64(*i),
        RecordId::Str(s) => Bson::String(s.clone()),
    }
}

fn value_bson(value: &Value) -> StoreResult<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| query_error("Failed to convert JSON to BSON", e))
}

// ---------------------------------------------------------------------------
// MongoStore
// ---------------------------------------------------------------------------

/// Record store backed by a MongoDB collection
///
/// # Example
///
/// ```rust,ignore
/// use model_rest::storage::MongoStore;
///
/// let store = MongoStore::connect("mongodb://localhost", "mongoose-rest_test", "TestModel").await?;
/// let record = store.create(record).await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
    collection: Collection<Document>,
    schema: Arc<Schema>,
    id_field: Arc<str>,
}

impl MongoStore {
    /// Create a store over `collection` in the given database
    pub fn new(database: Database, collection: &str) -> Self {
        Self {
            collection: database.collection(collection),
            database,
            schema: Arc::new(Schema::new()),
            id_field: Arc::from(DEFAULT_ID_FIELD),
        }
    }

    /// Connect to MongoDB and open a store
    ///
    /// Fails only on an unusable connection string. An unreachable server
    /// is logged and the store is still returned: requests then fail with
    /// `StoreError::Unavailable` until the server comes up.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self::new(client.database(database), collection);

        match store.ping().await {
            Ok(()) => tracing::info!(database, collection, "Connected to MongoDB"),
            Err(e) => tracing::error!(database, collection, error = %e, "Unable to connect to MongoDB"),
        }

        Ok(store)
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_id_field(mut self, id_field: &str) -> Self {
        self.id_field = Arc::from(id_field);
        self
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Storage name of a model field
    fn storage_field<'a>(&self, field: &'a str) -> &'a str {
        if field == &*self.id_field { "_id" } else { field }
    }

    /// Convert a record into a document, mapping the id field to `_id`
    fn record_to_document(&self, record: &Record) -> StoreResult<Document> {
        let mut doc = Document::new();
        for (field, value) in record {
            doc.insert(self.storage_field(field), value_bson(value)?);
        }
        Ok(doc)
    }

    /// Convert a document back into a record, mapping `_id` to the id field
    fn document_to_record(&self, doc: Document) -> Record {
        let mut record = Record::new();
        for (field, value) in doc {
            let name = if field == "_id" { self.id_field.to_string() } else { field };
            record.insert(name, value.into_relaxed_extjson());
        }
        record
    }

    fn filter_document(&self, query: &ListQuery) -> StoreResult<Document> {
        let mut filter = Document::new();
        for cond in &query.conditions {
            let field = self.storage_field(&cond.field);
            let value = value_bson(&cond.value)?;
            let operator = match cond.op {
                Comparison::Eq => "$eq",
                Comparison::Gt => "$gt",
                Comparison::Lt => "$lt",
                Comparison::Gte => "$gte",
                Comparison::Lte => "$lte",
            };
            // Several conditions on one field share its operator document
            match filter.get_mut(field) {
                Some(Bson::Document(ops)) => {
                    ops.insert(operator, value);
                }
                _ => {
                    let mut ops = Document::new();
                    ops.insert(operator, value);
                    filter.insert(field, ops);
                }
            }
        }
        Ok(filter)
    }
}

#[async_trait]
impl DataStore for MongoStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Insert a new record and read it back.
    async fn create(&self, record: Record) -> StoreResult<Record> {
        self.schema
            .validate(&record, &self.id_field)
            .map_err(StoreError::Validation)?;

        let id = match record.get(&*self.id_field) {
            None | Some(Value::Null) => RecordId::Str(ObjectId::new().to_hex()),
            Some(value) => RecordId::from_value(value).ok_or_else(|| {
                StoreError::Validation(vec![FieldValidationError {
                    field: self.id_field.to_string(),
                    message: "must be an integer or a non-numeric string".to_string(),
                }])
            })?,
        };

        let record = with_leading_id(record, &self.id_field, &id);
        let doc = self.record_to_document(&record)?;

        self.collection.insert_one(doc).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::AlreadyExists { id: id.clone() }
            } else {
                map_mongo_error("Failed to create record", e)
            }
        })?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| query_error("Failed to read back created record", id))
    }

    async fn find_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        let doc = self
            .collection
            .find_one(doc! { "_id": id_bson(id) })
            .await
            .map_err(|e| map_mongo_error("Failed to get record", e))?;

        Ok(doc.map(|d| self.document_to_record(d)))
    }

    async fn find(&self, query: &ListQuery) -> StoreResult<Vec<Record>> {
        let filter = self.filter_document(query)?;
        let mut find = self.collection.find(filter).skip(query.skip as u64);

        if let Some(sort) = &query.sort {
            let direction = match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            let mut order = Document::new();
            order.insert(self.storage_field(&sort.field), direction);
            find = find.sort(order);
        }
        if let Some(limit) = query.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let docs: Vec<Document> = find
            .await
            .map_err(|e| map_mongo_error("Failed to list records", e))?
            .try_collect()
            .await
            .map_err(|e| map_mongo_error("Failed to collect records", e))?;

        Ok(docs.into_iter().map(|d| self.document_to_record(d)).collect())
    }

    async fn count(&self, query: &ListQuery) -> StoreResult<usize> {
        let filter = self.filter_document(query)?;
        let n = self
            .collection
            .count_documents(filter)
            .await
            .map_err(|e| map_mongo_error("Failed to count records", e))?;
        Ok(usize::try_from(n).unwrap_or(usize::MAX))
    }

    /// Apply the patch with `$set` and return the updated record.
    async fn update_by_id(&self, id: &RecordId, mut patch: Record) -> StoreResult<Record> {
        patch.remove(&*self.id_field);
        self.schema
            .validate_patch(&patch, &self.id_field)
            .map_err(StoreError::Validation)?;

        let filter = doc! { "_id": id_bson(id) };
        if patch.is_empty() {
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| StoreError::NotFound { id: id.clone() });
        }

        let set = self.record_to_document(&patch)?;
        let updated = self
            .collection
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| map_mongo_error("Failed to update record", e))?;

        updated
            .map(|d| self.document_to_record(d))
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn delete_by_id(&self, id: &RecordId) -> StoreResult<Record> {
        let removed = self
            .collection
            .find_one_and_delete(doc! { "_id": id_bson(id) })
            .await
            .map_err(|e| map_mongo_error("Failed to delete record", e))?;

        removed
            .map(|d| self.document_to_record(d))
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| map_mongo_error("Ping failed", e))
    }
}
