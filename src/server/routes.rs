//! Route binder: mounts the five CRUD endpoints of one model

use super::handlers::{
    ModelState, create_record, delete_record, get_record, list_records, update_record,
};
use crate::core::auth::ModelAuth;
use crate::core::hooks::Hooks;
use crate::core::store::DataStore;
use axum::{Router, routing::get};
use std::sync::Arc;

/// Prefix models are mounted under unless told otherwise
pub const DEFAULT_PREFIX: &str = "/api/v1";

/// REST endpoints for a single model
///
/// | Method | Path          | Operation |
/// |--------|---------------|-----------|
/// | GET    | `{base}`      | list      |
/// | POST   | `{base}`      | create    |
/// | GET    | `{base}/{id}` | get       |
/// | PATCH  | `{base}/{id}` | update    |
/// | DELETE | `{base}/{id}` | delete    |
///
/// The base path defaults to `/api/v1/<name>`.
///
/// # Example
///
/// ```rust,ignore
/// let app = ModelRest::new("TestModel", InMemoryStore::new())
///     .with_auth(auth)
///     .with_hooks(hooks)
///     .routes();
/// ```
#[derive(Clone)]
pub struct ModelRest {
    name: String,
    store: Arc<dyn DataStore>,
    auth: ModelAuth,
    hooks: Hooks,
    base_path: String,
}

impl ModelRest {
    pub fn new(name: impl Into<String>, store: impl DataStore + 'static) -> Self {
        Self::from_arc(name, Arc::new(store))
    }

    /// Mount a store that is shared with other code
    pub fn from_arc(name: impl Into<String>, store: Arc<dyn DataStore>) -> Self {
        let name = name.into();
        Self {
            base_path: join_path(DEFAULT_PREFIX, &name),
            name,
            store,
            auth: ModelAuth::default(),
            hooks: Hooks::default(),
        }
    }

    pub fn with_auth(mut self, auth: ModelAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Mount under `<prefix>/<name>`
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.base_path = join_path(prefix, &self.name);
        self
    }

    /// Mount at exactly `base_path`
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize(base_path);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Build the router serving this model
    pub fn routes(&self) -> Router {
        let state = ModelState::new(
            self.name.clone(),
            self.store.clone(),
            self.auth.clone(),
            self.hooks.clone(),
        );

        let item_path = if self.base_path == "/" {
            "/{id}".to_string()
        } else {
            format!("{}/{{id}}", self.base_path)
        };

        tracing::debug!(model = %self.name, base_path = %self.base_path, "mounting model routes");

        Router::new()
            .route(&self.base_path, get(list_records).post(create_record))
            .route(
                &item_path,
                get(get_record).patch(update_record).delete(delete_record),
            )
            .with_state(state)
    }
}

impl std::fmt::Debug for ModelRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRest")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("backend", &self.store.backend())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Mount `model` on an existing router
pub fn route(router: Router, model: &ModelRest) -> Router {
    router.merge(model.routes())
}

/// Leading slash, no trailing slash, `/` for the root
fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}", trimmed)
}

fn join_path(prefix: &str, name: &str) -> String {
    let prefix = normalize(prefix);
    if prefix == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", prefix, name)
    }
}
