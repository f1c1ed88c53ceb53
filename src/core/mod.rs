//! Core module containing the model-agnostic building blocks

pub mod auth;
pub mod context;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;

pub use auth::{FieldAuth, ModelAuth, Permission};
pub use context::{Operation, RequestContext};
pub use error::{ErrorResponse, FieldValidationError, RestError, StorageError, ValidationError};
pub use filter::FieldFilter;
pub use hooks::{Hook, HookChain, HookOutcome, Hooks, hook_fn};
pub use query::{Comparison, Condition, ListQuery, SortDirection, SortKey};
pub use record::{DEFAULT_ID_FIELD, Record, RecordId};
pub use schema::{FieldSpec, FieldType, Schema};
pub use store::{DataStore, StoreError, StoreResult};
