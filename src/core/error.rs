//! Typed error handling for generated model endpoints
//!
//! Every failure a request can hit is a [`RestError`]. Handlers return it
//! directly and axum renders it through [`IntoResponse`] as
//! `{"code": .., "message": .., "details": ..}` with a matching status.
//!
//! # Error Categories
//!
//! - [`RestError::NotFound`]: requested id absent on get/update/delete
//! - [`RestError::AlreadyExists`]: create with an id that is taken
//! - [`ValidationError`]: malformed input or store-level schema violation
//! - [`RestError::HookRejected`]: a hook halted the pipeline
//! - [`StorageError`]: the data store failed or is unreachable
//!
//! # Example
//!
//! ```rust,ignore
//! match store.find_by_id(&id).await {
//!     Ok(Some(record)) => Ok(Json(record)),
//!     Ok(None) => Err(RestError::NotFound { model: "TestModel".into(), id }),
//!     Err(e) => Err(RestError::from_store("TestModel", e)),
//! }
//! ```

use crate::core::record::RecordId;
use crate::core::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The error type returned by every generated endpoint
#[derive(Debug)]
pub enum RestError {
    /// No record with this id
    NotFound { model: String, id: RecordId },

    /// A record with this id is already stored
    AlreadyExists { model: String, id: RecordId },

    /// Input or schema validation failed
    Validation(ValidationError),

    /// A hook terminated the pipeline with an error
    HookRejected { status: StatusCode, message: String },

    Storage(StorageError),

    /// Failure inside the library itself, for hooks and custom stores
    Internal(String),
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::NotFound { model, id } => {
                write!(f, "{} with id '{}' not found", model, id)
            }
            RestError::AlreadyExists { model, id } => {
                write!(f, "{} with id '{}' already exists", model, id)
            }
            RestError::Validation(e) => write!(f, "{}", e),
            RestError::HookRejected { message, .. } => write!(f, "{}", message),
            RestError::Storage(e) => write!(f, "{}", e),
            RestError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestError::Validation(e) => Some(e),
            RestError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// `{model, id}` for id errors, `{fields: [..]}` for field validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RestError {
    /// Halt a hook chain with the given status and message
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        RestError::HookRejected {
            status,
            message: message.into(),
        }
    }

    /// Halt a hook chain with `403 Forbidden`
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::rejected(StatusCode::FORBIDDEN, message)
    }

    /// Map a store failure onto the HTTP-facing error for `model`
    pub fn from_store(model: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => RestError::NotFound {
                model: model.to_string(),
                id,
            },
            StoreError::AlreadyExists { id } => RestError::AlreadyExists {
                model: model.to_string(),
                id,
            },
            StoreError::Validation(errors) => {
                RestError::Validation(ValidationError::FieldErrors(errors))
            }
            StoreError::Unavailable { backend, message } => {
                RestError::Storage(StorageError::Unavailable { backend, message })
            }
            StoreError::Query { backend, message } => {
                RestError::Storage(StorageError::QueryError { backend, message })
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::AlreadyExists { .. } => StatusCode::CONFLICT,
            RestError::Validation(_) => StatusCode::BAD_REQUEST,
            RestError::HookRejected { status, .. } => *status,
            RestError::Storage(e) => e.status_code(),
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code clients can match on
    pub fn error_code(&self) -> &'static str {
        match self {
            RestError::NotFound { .. } => "RECORD_NOT_FOUND",
            RestError::AlreadyExists { .. } => "RECORD_ALREADY_EXISTS",
            RestError::Validation(_) => "VALIDATION_ERROR",
            RestError::HookRejected { .. } => "HOOK_REJECTED",
            RestError::Storage(e) => e.error_code(),
            RestError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            RestError::NotFound { model, id } | RestError::AlreadyExists { model, id } => {
                Some(serde_json::json!({ "model": model, "id": id }))
            }
            RestError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            RestError::Validation(ValidationError::FieldError { field, message }) => {
                Some(serde_json::json!({ "fields": [{ "field": field, "message": message }] }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

/// Rejected request input, always a 400
#[derive(Debug)]
pub enum ValidationError {
    FieldError { field: String, message: String },

    /// Every schema violation found in one record
    FieldErrors(Vec<FieldValidationError>),

    /// Body or query parameter is not valid JSON
    InvalidJson { message: String },

    /// Body is valid JSON but not usable for the operation
    InvalidBody { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldError { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
            ValidationError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        RestError::Validation(err)
    }
}

/// Store failures that are not about the request itself
#[derive(Debug)]
pub enum StorageError {
    /// Backend cannot be reached
    Unavailable { backend: String, message: String },

    QueryError { backend: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable { backend, message } => {
                write!(f, "Storage backend '{}' is unavailable: {}", backend, message)
            }
            StorageError::QueryError { backend, message } => {
                write!(f, "{} query error: {}", backend, message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::QueryError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Unavailable { .. } => "STORE_UNAVAILABLE",
            StorageError::QueryError { .. } => "STORAGE_ERROR",
        }
    }
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        RestError::Storage(err)
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}
