//! # model-rest
//!
//! Auto-generated REST CRUD endpoints for a data model, with field-level
//! authorization and per-operation hook chains, served with axum.
//!
//! ## Features
//!
//! - **Five Endpoints per Model**: list, get, create, update (PATCH), delete
//! - **Field Authorization**: per-field view/edit permissions, constant or predicate
//! - **Hook Chains**: `pre_all` plus one chain per operation, able to rewrite or stop the request
//! - **Silent Write Filtering**: fields the caller may not edit are dropped, not rejected
//! - **Pluggable Storage**: in-memory store built in, MongoDB behind `mongodb_backend`
//! - **Configuration-Based**: describe the model and its permissions in YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use model_rest::prelude::*;
//!
//! let auth = ModelAuth::new()
//!     .field("_id", FieldAuth::open())
//!     .field("user", FieldAuth::open())
//!     .field("text", FieldAuth::new(true, Permission::users(["admin"])));
//!
//! let hooks = Hooks::new().pre_all(hook_fn("identify", |ctx| {
//!     if let Some(user) = ctx.query_param("user").map(String::from) {
//!         ctx.set_user(user);
//!     }
//!     Ok(HookOutcome::Next)
//! }));
//!
//! ServerBuilder::new()
//!     .register_model(
//!         ModelRest::new("TestModel", InMemoryStore::new())
//!             .with_auth(auth)
//!             .with_hooks(hooks),
//!     )
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{FieldAuth, ModelAuth, Permission},
        context::{Operation, RequestContext},
        error::{RestError, StorageError, ValidationError},
        filter::FieldFilter,
        hooks::{Hook, HookChain, HookOutcome, Hooks, hook_fn},
        query::{Condition, ListQuery, SortKey},
        record::{Record, RecordId},
        schema::{FieldSpec, FieldType, Schema},
        store::{DataStore, StoreError, StoreResult},
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoStore;

    // === Config ===
    pub use crate::config::{AppConfig, ModelConfig, ServerConfig};

    // === Server ===
    pub use crate::server::{ModelRest, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{Router, http::StatusCode};
}
