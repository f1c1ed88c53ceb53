//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes and error codes
//! - Error responses are properly formatted
//! - Store errors are mapped onto HTTP errors
//! - An unreachable store surfaces as 503 without taking the server down

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_test::TestServer;
use model_rest::core::error::FieldValidationError;
use model_rest::prelude::*;

fn not_found(id: i64) -> RestError {
    RestError::NotFound {
        model: "TestModel".to_string(),
        id: RecordId::Int(id),
    }
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_not_found_returns_404() {
        assert_eq!(not_found(1).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_already_exists_returns_409() {
        let err = RestError::AlreadyExists {
            model: "TestModel".to_string(),
            id: RecordId::from("abc"),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_error_returns_400() {
        let err = RestError::Validation(ValidationError::InvalidBody {
            message: "expected an object".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_hook_rejection_uses_its_status() {
        assert_eq!(
            RestError::rejected(StatusCode::TOO_MANY_REQUESTS, "slow down").status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(RestError::forbidden("no").status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_storage_errors() {
        let unavailable = RestError::Storage(StorageError::Unavailable {
            backend: "mongodb".to_string(),
            message: "server selection timeout".to_string(),
        });
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let query = RestError::Storage(StorageError::QueryError {
            backend: "mongodb".to_string(),
            message: "bad query".to_string(),
        });
        assert_eq!(query.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_returns_500() {
        let err = RestError::Internal("boom".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases = vec![
            (not_found(1), "RECORD_NOT_FOUND"),
            (
                RestError::AlreadyExists {
                    model: "M".to_string(),
                    id: RecordId::Int(1),
                },
                "RECORD_ALREADY_EXISTS",
            ),
            (
                RestError::Validation(ValidationError::InvalidJson {
                    message: "eof".to_string(),
                }),
                "VALIDATION_ERROR",
            ),
            (RestError::forbidden("no"), "HOOK_REJECTED"),
            (
                RestError::Storage(StorageError::Unavailable {
                    backend: "b".to_string(),
                    message: "m".to_string(),
                }),
                "STORE_UNAVAILABLE",
            ),
            (
                RestError::Storage(StorageError::QueryError {
                    backend: "b".to_string(),
                    message: "m".to_string(),
                }),
                "STORAGE_ERROR",
            ),
            (RestError::Internal("x".to_string()), "INTERNAL_ERROR"),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code, "wrong code for {}", err);
        }
    }
}

// =============================================================================
// Error Response Format Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_error_response_has_code_and_message() {
        let response = not_found(7).to_response();

        assert_eq!(response.code, "RECORD_NOT_FOUND");
        assert!(response.message.contains("TestModel"));
        assert!(response.message.contains("not found"));
    }

    #[test]
    fn test_error_response_includes_details_for_not_found() {
        let details = not_found(7).to_response().details.unwrap();
        assert_eq!(details["model"], "TestModel");
        assert_eq!(details["id"], 7);
    }

    #[test]
    fn test_validation_errors_include_field_details() {
        let err = RestError::Validation(ValidationError::FieldErrors(vec![
            FieldValidationError {
                field: "user".to_string(),
                message: "expected string".to_string(),
            },
            FieldValidationError {
                field: "_id".to_string(),
                message: "expected integer".to_string(),
            },
        ]));

        let details = err.to_response().details.unwrap();
        let fields = details["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1]["field"], "_id");
    }

    #[test]
    fn test_hook_rejection_has_no_details() {
        assert!(RestError::forbidden("no").to_response().details.is_none());
    }

    #[tokio::test]
    async fn test_into_response_renders_json() {
        let response = not_found(3).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "RECORD_NOT_FOUND");
        assert_eq!(body["message"], "TestModel with id '3' not found");
    }
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_store_errors_convert() {
        let err = RestError::from_store(
            "TestModel",
            StoreError::AlreadyExists {
                id: RecordId::Int(1),
            },
        );
        assert!(matches!(err, RestError::AlreadyExists { .. }));

        let err = RestError::from_store(
            "TestModel",
            StoreError::Query {
                backend: "memory".to_string(),
                message: "poisoned".to_string(),
            },
        );
        assert!(matches!(err, RestError::Storage(StorageError::QueryError { .. })));
    }

    #[test]
    fn test_serde_json_error_converts() {
        let json_err = serde_json::from_str::<Value>("invalid").unwrap_err();
        let err: RestError = json_err.into();
        assert!(matches!(err, RestError::Validation(ValidationError::InvalidJson { .. })));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: RestError = StorageError::Unavailable {
            backend: "mongodb".to_string(),
            message: "down".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
    }
}

// =============================================================================
// Unreachable Store
// =============================================================================

mod unavailable_store_tests {
    use super::*;

    /// Store whose backend cannot be reached
    struct DownStore;

    fn down() -> StoreError {
        StoreError::Unavailable {
            backend: "down".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[async_trait]
    impl DataStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }

        fn id_field(&self) -> &str {
            "_id"
        }

        async fn create(&self, _record: Record) -> StoreResult<Record> {
            Err(down())
        }

        async fn find_by_id(&self, _id: &RecordId) -> StoreResult<Option<Record>> {
            Err(down())
        }

        async fn find(&self, _query: &ListQuery) -> StoreResult<Vec<Record>> {
            Err(down())
        }

        async fn count(&self, _query: &ListQuery) -> StoreResult<usize> {
            Err(down())
        }

        async fn update_by_id(&self, _id: &RecordId, _patch: Record) -> StoreResult<Record> {
            Err(down())
        }

        async fn delete_by_id(&self, _id: &RecordId) -> StoreResult<Record> {
            Err(down())
        }

        async fn ping(&self) -> StoreResult<()> {
            Err(down())
        }
    }

    #[tokio::test]
    async fn test_requests_fail_with_503_and_health_stays_up() {
        let app = ServerBuilder::new()
            .register_model(ModelRest::new("TestModel", DownStore))
            .build()
            .expect("Failed to build app");
        let server = TestServer::try_new(app).expect("Failed to create test server");

        let response = server.get("/api/v1/TestModel").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["code"], "STORE_UNAVAILABLE");

        server
            .post("/api/v1/TestModel")
            .json(&json!({ "_id": 1 }))
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);

        server.get("/health").await.assert_status_ok();
    }
}
