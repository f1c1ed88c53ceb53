//! Per-request context shared by hooks and permission predicates

use crate::core::record::{Record, RecordId};
use axum::http::{HeaderMap, Method};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Operation category of a generated endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::List | Operation::Get => Method::GET,
            Operation::Create => Method::POST,
            Operation::Update => Method::PATCH,
            Operation::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable bag carried through one request
///
/// Hooks identify the acting user, rewrite the body, narrow the list query
/// and stash arbitrary values; permission predicates read it back.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    received_at: DateTime<Utc>,
    model: String,
    operation: Operation,
    record_id: Option<RecordId>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Option<Value>,
    user: Option<String>,
    filter: Record,
    values: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new(model: impl Into<String>, operation: Operation) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            received_at: Utc::now(),
            model: model.into(),
            operation,
            record_id: None,
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: None,
            user: None,
            filter: Record::new(),
            values: HashMap::new(),
        }
    }

    pub fn with_record_id(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Id from the URL path (get, update, delete)
    pub fn record_id(&self) -> Option<&RecordId> {
        self.record_id.as_ref()
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.query
    }

    /// Single query-string parameter
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut Value> {
        self.body.as_mut()
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    /// Acting user, as identified by a hook
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }

    pub fn clear_user(&mut self) {
        self.user = None;
    }

    /// Restrict the list operation to records where `field == value`
    ///
    /// Unlike client-supplied filters these constraints apply even to fields
    /// the caller cannot view.
    pub fn add_filter(&mut self, field: impl Into<String>, value: Value) {
        self.filter.insert(field.into(), value);
    }

    pub fn filter_constraints(&self) -> &Record {
        &self.filter
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
