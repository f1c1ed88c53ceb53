//! HTTP handlers of the generated CRUD endpoints
//!
//! Every handler follows the same pipeline: build the request context, run
//! `pre_all` and the operation's hook chain, apply the write filter to the
//! payload, call the store, apply the read filter to the result.

use crate::core::auth::ModelAuth;
use crate::core::context::{Operation, RequestContext};
use crate::core::error::{RestError, ValidationError};
use crate::core::filter::FieldFilter;
use crate::core::hooks::{HookOutcome, Hooks};
use crate::core::query::{Condition, ListQuery};
use crate::core::record::{Record, RecordId};
use crate::core::store::{DataStore, StoreError};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared state of one mounted model
#[derive(Clone)]
pub struct ModelState {
    inner: Arc<ModelShared>,
}

struct ModelShared {
    name: String,
    store: Arc<dyn DataStore>,
    auth: ModelAuth,
    hooks: Hooks,
}

impl ModelState {
    pub fn new(name: String, store: Arc<dyn DataStore>, auth: ModelAuth, hooks: Hooks) -> Self {
        Self {
            inner: Arc::new(ModelShared {
                name,
                store,
                auth,
                hooks,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.inner.store
    }

    fn context(
        &self,
        operation: Operation,
        query: HashMap<String, String>,
        headers: HeaderMap,
    ) -> RequestContext {
        RequestContext::new(self.inner.name.clone(), operation)
            .with_query(query)
            .with_headers(headers)
    }

    /// Run the hook chains; `Some` carries the response of a hook that answered
    async fn run_hooks(&self, ctx: &mut RequestContext) -> Result<Option<Response>, RestError> {
        tracing::debug!(
            request_id = %ctx.request_id(),
            model = %self.inner.name,
            method = %ctx.operation().method(),
            operation = %ctx.operation(),
            "handling request"
        );
        match self.inner.hooks.run(ctx).await? {
            HookOutcome::Next => Ok(None),
            HookOutcome::Respond(resp) => Ok(Some(resp)),
        }
    }

    fn filter<'a>(&'a self, ctx: &'a RequestContext) -> FieldFilter<'a> {
        FieldFilter::new(&self.inner.auth, ctx)
    }

    fn store_error(&self, ctx: &RequestContext, err: StoreError) -> RestError {
        if matches!(err, StoreError::Unavailable { .. } | StoreError::Query { .. }) {
            tracing::warn!(
                request_id = %ctx.request_id(),
                model = %self.inner.name,
                operation = %ctx.operation(),
                error = %err,
                "store operation failed"
            );
        }
        RestError::from_store(&self.inner.name, err)
    }
}

/// Parse an optional JSON body; an empty body is `None`
fn parse_body(body: &Bytes) -> Result<Option<Value>, RestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(body)?))
}

/// Turn the (possibly hook-rewritten) body into a payload record
fn payload(body: Option<Value>) -> Result<Record, RestError> {
    match body {
        None => Ok(Record::new()),
        Some(Value::Object(record)) => Ok(record),
        Some(other) => Err(ValidationError::InvalidBody {
            message: format!("expected a JSON object, got {}", json_kind(&other)),
        }
        .into()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Apply the write filter, logging what it dropped
fn writable(state: &ModelState, ctx: &RequestContext, payload: Record) -> Record {
    let (kept, dropped) = state.filter(ctx).writable(payload);
    if !dropped.is_empty() {
        tracing::debug!(
            request_id = %ctx.request_id(),
            model = %state.name(),
            operation = %ctx.operation(),
            user = ?ctx.user(),
            fields = ?dropped,
            "dropped non-editable fields"
        );
    }
    kept
}

/// List records
///
/// GET {base}?filter={..}&sort=field:desc&skip=0&limit=10
pub async fn list_records(
    State(state): State<ModelState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    let mut ctx = state.context(Operation::List, params, headers);
    if let Some(resp) = state.run_hooks(&mut ctx).await? {
        return Ok(resp);
    }

    let filter = state.filter(&ctx);
    let mut query = ListQuery::from_params(ctx.query())?;

    // Clients cannot probe fields they are not allowed to see
    let ignored = query.retain_fields(|field| filter.can_view(field));
    if !ignored.is_empty() {
        tracing::debug!(
            request_id = %ctx.request_id(),
            fields = ?ignored,
            "ignored filter on non-viewable fields"
        );
    }
    for (field, value) in ctx.filter_constraints() {
        query = query.with_condition(Condition::eq(field.clone(), value.clone()));
    }

    let records = state
        .store()
        .find(&query)
        .await
        .map_err(|e| state.store_error(&ctx, e))?;

    tracing::debug!(
        request_id = %ctx.request_id(),
        model = %state.name(),
        count = records.len(),
        "listed records"
    );

    Ok(Json(filter.visible_all(records)).into_response())
}

/// Get a single record
///
/// GET {base}/{id}
pub async fn get_record(
    State(state): State<ModelState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    let id = RecordId::parse(&id);
    let mut ctx = state
        .context(Operation::Get, params, headers)
        .with_record_id(id.clone());
    if let Some(resp) = state.run_hooks(&mut ctx).await? {
        return Ok(resp);
    }

    let record = state
        .store()
        .find_by_id(&id)
        .await
        .map_err(|e| state.store_error(&ctx, e))?
        .ok_or_else(|| RestError::NotFound {
            model: state.name().to_string(),
            id: id.clone(),
        })?;

    Ok(Json(state.filter(&ctx).visible(record)).into_response())
}

/// Create a record
///
/// POST {base}
pub async fn create_record(
    State(state): State<ModelState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RestError> {
    let body = parse_body(&body)?;
    let mut ctx = state
        .context(Operation::Create, params, headers)
        .with_body(body);
    if let Some(resp) = state.run_hooks(&mut ctx).await? {
        return Ok(resp);
    }

    let record = writable(&state, &ctx, payload(ctx.body().cloned())?);
    let stored = state
        .store()
        .create(record)
        .await
        .map_err(|e| state.store_error(&ctx, e))?;

    tracing::debug!(
        request_id = %ctx.request_id(),
        model = %state.name(),
        id = ?stored.get(state.store().id_field()),
        "created record"
    );

    Ok(Json(state.filter(&ctx).visible(stored)).into_response())
}

/// Update a record with a partial payload
///
/// PATCH {base}/{id}
pub async fn update_record(
    State(state): State<ModelState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RestError> {
    let id = RecordId::parse(&id);
    let body = parse_body(&body)?;
    let mut ctx = state
        .context(Operation::Update, params, headers)
        .with_record_id(id.clone())
        .with_body(body);
    if let Some(resp) = state.run_hooks(&mut ctx).await? {
        return Ok(resp);
    }

    let mut patch = writable(&state, &ctx, payload(ctx.body().cloned())?);
    patch.remove(state.store().id_field());

    let updated = state
        .store()
        .update_by_id(&id, patch)
        .await
        .map_err(|e| state.store_error(&ctx, e))?;

    tracing::debug!(
        request_id = %ctx.request_id(),
        model = %state.name(),
        id = %id,
        "updated record"
    );

    Ok(Json(state.filter(&ctx).visible(updated)).into_response())
}

/// Delete a record
///
/// DELETE {base}/{id}
pub async fn delete_record(
    State(state): State<ModelState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    let id = RecordId::parse(&id);
    let mut ctx = state
        .context(Operation::Delete, params, headers)
        .with_record_id(id.clone());
    if let Some(resp) = state.run_hooks(&mut ctx).await? {
        return Ok(resp);
    }

    state
        .store()
        .delete_by_id(&id)
        .await
        .map_err(|e| state.store_error(&ctx, e))?;

    tracing::debug!(
        request_id = %ctx.request_id(),
        model = %state.name(),
        id = %id,
        "deleted record"
    );

    Ok(Json(json!({ "deleted": true, "id": id })).into_response())
}
