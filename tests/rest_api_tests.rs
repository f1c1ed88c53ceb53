//! End-to-end tests of the generated REST endpoints
//!
//! These tests drive a full server over HTTP with `axum_test`, using the
//! reference model: `_id` (integer), `user` and `text` (strings), where
//! `text` may only be edited by the `admin` user. A `pre_all` hook reads
//! the acting user from the `user` query parameter.

use axum::http::StatusCode;
use axum_test::TestServer;
use model_rest::prelude::*;
use model_rest::server::routes;

const URL: &str = "/api/v1/TestModel";

fn reference_schema() -> Schema {
    Schema::new()
        .field("_id", FieldType::Integer)
        .field("user", FieldType::String)
        .field("text", FieldType::String)
}

fn reference_auth() -> ModelAuth {
    ModelAuth::new()
        .field("_id", FieldAuth::new(true, true))
        .field("user", FieldAuth::new(true, true))
        .field(
            "text",
            FieldAuth::new(true, Permission::predicate(|ctx| ctx.user() == Some("admin"))),
        )
}

fn identify() -> Hooks {
    Hooks::new().pre_all(hook_fn("identify", |ctx| {
        if let Some(user) = ctx.query_param("user").map(String::from) {
            ctx.set_user(user);
        }
        Ok(HookOutcome::Next)
    }))
}

fn create_test_server_with(auth: ModelAuth, hooks: Hooks) -> (TestServer, InMemoryStore) {
    let store = InMemoryStore::new().with_schema(reference_schema());
    let model = ModelRest::new("TestModel", store.clone())
        .with_auth(auth)
        .with_hooks(hooks);

    let app = ServerBuilder::new()
        .register_model(model)
        .build()
        .expect("Failed to build app");

    let server = TestServer::try_new(app).expect("Failed to create test server");
    (server, store)
}

fn create_test_server() -> (TestServer, InMemoryStore) {
    create_test_server_with(reference_auth(), identify())
}

async fn seed(server: &TestServer) {
    for (id, user, text) in [(0, "user0", "text1"), (1, "user1", "text2")] {
        server
            .post(URL)
            .add_query_param("user", "admin")
            .json(&json!({ "_id": id, "user": user, "text": text }))
            .await
            .assert_status_ok();
    }
}

// =============================================================================
// Reference Scenario
// =============================================================================

mod reference_scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_and_user_edit_flow() {
        let (server, store) = create_test_server();
        seed(&server).await;

        let body: Value = server.get(&format!("{}/1", URL)).await.json();
        assert_eq!(body["text"], "text2");

        let list: Vec<Value> = server.get(URL).await.json();
        assert_eq!(list.len(), 2);

        server
            .patch(&format!("{}/1", URL))
            .add_query_param("user", "admin")
            .json(&json!({ "text": "text2 mod as admin" }))
            .await
            .assert_status_ok();
        let body: Value = server.get(&format!("{}/1", URL)).await.json();
        assert_eq!(body["text"], "text2 mod as admin");

        // Silently dropped: still 200, value unchanged
        let response = server
            .patch(&format!("{}/1", URL))
            .add_query_param("user", "user")
            .json(&json!({ "text": "text2 mod as user" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["text"], "text2 mod as admin");

        let body: Value = server.get(&format!("{}/1", URL)).await.json();
        assert_eq!(body["text"], "text2 mod as admin");

        server.delete(&format!("{}/0", URL)).await.assert_status_ok();
        server.delete(&format!("{}/1", URL)).await.assert_status_ok();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_admin_create_drops_text() {
        let (server, _) = create_test_server();

        let response = server
            .post(URL)
            .add_query_param("user", "user")
            .json(&json!({ "_id": 5, "user": "u", "text": "nope" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body, json!({ "_id": 5, "user": "u" }));
    }
}

// =============================================================================
// CRUD Behaviour
// =============================================================================

mod crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_empty() {
        let (server, _) = create_test_server();
        let body: Vec<Value> = server.get(URL).await.json();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_values() {
        let (server, _) = create_test_server();

        let created: Value = server
            .post(URL)
            .add_query_param("user", "admin")
            .json(&json!({ "_id": 42, "user": "alice", "text": "hello" }))
            .await
            .json();

        let fetched: Value = server.get(&format!("{}/42", URL)).await.json();
        assert_eq!(created, fetched);
        assert_eq!(fetched, json!({ "_id": 42, "user": "alice", "text": "hello" }));
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let (server, _) = create_test_server();
        let created: Value = server.post(URL).json(&json!({ "user": "bob" })).await.json();
        assert_eq!(created["_id"], 1);

        server.get(&format!("{}/1", URL)).await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_get_missing_returns_404() {
        let (server, _) = create_test_server();
        let response = server.get(&format!("{}/99", URL)).await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Value = response.json();
        assert_eq!(body["code"], "RECORD_NOT_FOUND");
        assert_eq!(body["details"]["id"], 99);
    }

    #[tokio::test]
    async fn test_update_missing_returns_404_and_count_unchanged() {
        let (server, store) = create_test_server();
        seed(&server).await;

        let response = server
            .patch(&format!("{}/7", URL))
            .add_query_param("user", "admin")
            .json(&json!({ "text": "ghost" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_never_changes_id() {
        let (server, _) = create_test_server();
        seed(&server).await;

        let body: Value = server
            .patch(&format!("{}/1", URL))
            .json(&json!({ "_id": 9, "user": "renamed" }))
            .await
            .json();
        assert_eq!(body["_id"], 1);
        assert_eq!(body["user"], "renamed");
        server.get(&format!("{}/9", URL)).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_patch_returns_current_record() {
        let (server, _) = create_test_server();
        seed(&server).await;

        let body: Value = server
            .patch(&format!("{}/0", URL))
            .add_query_param("user", "user")
            .json(&json!({ "text": "dropped" }))
            .await
            .json();
        assert_eq!(body["text"], "text1");
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_404() {
        let (server, _) = create_test_server();
        seed(&server).await;

        let response = server.delete(&format!("{}/0", URL)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body, json!({ "deleted": true, "id": 0 }));

        server.get(&format!("{}/0", URL)).await.assert_status(StatusCode::NOT_FOUND);
        server.delete(&format!("{}/0", URL)).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_id_returns_409() {
        let (server, store) = create_test_server();
        seed(&server).await;

        let response = server.post(URL).json(&json!({ "_id": 1, "user": "x" })).await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["code"], "RECORD_ALREADY_EXISTS");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_schema_violation_returns_400() {
        let (server, store) = create_test_server();

        let response = server.post(URL).json(&json!({ "_id": 1, "user": 12 })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["fields"][0]["field"], "user");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_string_path_id_is_not_found() {
        let (server, _) = create_test_server();
        seed(&server).await;
        server.get(&format!("{}/abc", URL)).await.assert_status(StatusCode::NOT_FOUND);
    }

    fn schemaless_server() -> (TestServer, InMemoryStore) {
        let store = InMemoryStore::new();
        let app = ServerBuilder::new()
            .register_model(ModelRest::new("M", store.clone()))
            .build()
            .expect("Failed to build app");
        (TestServer::try_new(app).expect("Failed to create test server"), store)
    }

    #[tokio::test]
    async fn test_numeric_string_id_is_rejected() {
        let (server, store) = schemaless_server();

        let response = server
            .post("/api/v1/M")
            .json(&json!({ "_id": "5", "t": "x" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["details"]["fields"][0]["field"], "_id");
        assert!(store.is_empty());

        // The same id sent as a number is reachable through its path
        server
            .post("/api/v1/M")
            .json(&json!({ "_id": 5, "t": "x" }))
            .await
            .assert_status_ok();
        let found: Value = server.get("/api/v1/M/5").await.json();
        assert_eq!(found, json!({ "_id": 5, "t": "x" }));
        server.delete("/api/v1/M/5").await.assert_status_ok();
        server.get("/api/v1/M/5").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_numeric_string_id_round_trips() {
        let (server, _) = schemaless_server();
        server
            .post("/api/v1/M")
            .json(&json!({ "_id": "5a", "t": "x" }))
            .await
            .assert_status_ok();

        let found: Value = server.get("/api/v1/M/5a").await.json();
        assert_eq!(found["_id"], "5a");
        server.delete("/api/v1/M/5a").await.assert_status_ok();
        server.get("/api/v1/M/5a").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ids_outside_i64_are_rejected() {
        let (server, store) = schemaless_server();
        for id in [json!(2.5), json!(u64::MAX)] {
            server
                .post("/api/v1/M")
                .json(&json!({ "_id": id }))
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_auto_id_after_max_returns_400_and_store_keeps_serving() {
        let (server, store) = schemaless_server();
        server
            .post("/api/v1/M")
            .json(&json!({ "_id": i64::MAX }))
            .await
            .assert_status_ok();

        let response = server.post("/api/v1/M").json(&json!({ "t": "auto" })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        server.get("/api/v1/M").await.assert_status_ok();
        server
            .post("/api/v1/M")
            .json(&json!({ "_id": 1, "t": "explicit" }))
            .await
            .assert_status_ok();
        assert_eq!(store.len(), 2);
    }
}

// =============================================================================
// List Queries
// =============================================================================

mod list_query_tests {
    use super::*;

    async fn seeded() -> TestServer {
        let (server, _) = create_test_server();
        for (id, user) in [(0, "carol"), (1, "alice"), (2, "bob"), (3, "alice")] {
            server
                .post(URL)
                .json(&json!({ "_id": id, "user": user }))
                .await
                .assert_status_ok();
        }
        server
    }

    fn ids(list: &[Value]) -> Vec<i64> {
        list.iter().filter_map(|r| r["_id"].as_i64()).collect()
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let server = seeded().await;
        let list: Vec<Value> = server.get(URL).await.json();
        assert_eq!(ids(&list), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_filter_and_sort() {
        let server = seeded().await;
        let list: Vec<Value> = server
            .get(URL)
            .add_query_param("filter", r#"{"user":"alice"}"#)
            .add_query_param("sort", "_id:desc")
            .await
            .json();
        assert_eq!(ids(&list), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_comparison_skip_and_limit() {
        let server = seeded().await;
        let list: Vec<Value> = server
            .get(URL)
            .add_query_param("filter", r#"{"_id>=":1}"#)
            .add_query_param("skip", "1")
            .add_query_param("limit", "1")
            .await
            .json();
        assert_eq!(ids(&list), vec![2]);
    }

    #[tokio::test]
    async fn test_invalid_filter_returns_400() {
        let server = seeded().await;
        let response = server.get(URL).add_query_param("filter", "{nope").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_filter_on_hidden_field_is_ignored() {
        let auth = reference_auth().field("user", FieldAuth::new(false, true));
        let (server, _) = create_test_server_with(auth, identify());
        for (id, user) in [(0, "alice"), (1, "bob")] {
            server
                .post(URL)
                .json(&json!({ "_id": id, "user": user }))
                .await
                .assert_status_ok();
        }

        let list: Vec<Value> = server
            .get(URL)
            .add_query_param("filter", r#"{"user":"alice"}"#)
            .await
            .json();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|r| r.get("user").is_none()));
    }
}

// =============================================================================
// Field Visibility
// =============================================================================

mod visibility_tests {
    use super::*;

    fn secret_auth() -> ModelAuth {
        reference_auth().field("secret", FieldAuth::new(Permission::users(["admin"]), true))
    }

    #[tokio::test]
    async fn test_hidden_field_never_in_any_response() {
        let (server, _) = create_test_server_with(secret_auth(), identify());

        let created: Value = server
            .post(URL)
            .json(&json!({ "_id": 1, "user": "u", "secret": "s3cr3t" }))
            .await
            .json();
        assert!(created.get("secret").is_none());

        let fetched: Value = server.get(&format!("{}/1", URL)).await.json();
        assert!(fetched.get("secret").is_none());

        let list: Vec<Value> = server.get(URL).await.json();
        assert!(list[0].get("secret").is_none());

        let updated: Value = server
            .patch(&format!("{}/1", URL))
            .json(&json!({ "user": "v" }))
            .await
            .json();
        assert!(updated.get("secret").is_none());

        // Stored all along, visible to the admin
        let admin: Value = server
            .get(&format!("{}/1", URL))
            .add_query_param("user", "admin")
            .await
            .json();
        assert_eq!(admin["secret"], "s3cr3t");
    }

    #[tokio::test]
    async fn test_unlisted_fields_default_to_open() {
        let (server, _) = create_test_server();
        let created: Value = server
            .post(URL)
            .json(&json!({ "_id": 1, "extra": true }))
            .await
            .json();
        assert_eq!(created["extra"], true);
    }

    #[tokio::test]
    async fn test_closed_default_hides_unlisted_fields() {
        let auth = reference_auth().with_default(FieldAuth::locked());
        let (server, store) = create_test_server_with(auth, identify());

        let created: Value = server
            .post(URL)
            .json(&json!({ "_id": 1, "extra": true }))
            .await
            .json();
        assert_eq!(created, json!({ "_id": 1 }));

        let stored = store.find_by_id(&RecordId::Int(1)).await.unwrap().unwrap();
        assert!(!stored.contains_key("extra"));
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

mod body_tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let (server, store) = create_test_server();
        let response = server
            .post(URL)
            .content_type("application/json")
            .text("{not json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_body_returns_400() {
        let (server, _) = create_test_server();
        let response = server.post(URL).json(&json!([1, 2, 3])).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_body_creates_record() {
        let (server, store) = create_test_server();
        let created: Value = server.post(URL).await.json();
        assert_eq!(created, json!({ "_id": 1 }));
        assert_eq!(store.len(), 1);
    }
}

// =============================================================================
// Router Composition
// =============================================================================

mod routing_tests {
    use super::*;

    #[tokio::test]
    async fn test_custom_base_path() {
        let model = ModelRest::new("Note", InMemoryStore::new()).with_base_path("/notes");
        let server = TestServer::try_new(model.routes()).unwrap();

        server.post("/notes").json(&json!({ "title": "t" })).await.assert_status_ok();
        let list: Vec<Value> = server.get("/notes").await.json();
        assert_eq!(list.len(), 1);
        server.get("/notes/1").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_route_onto_existing_router() {
        let model = ModelRest::new("Note", InMemoryStore::new()).with_prefix("/v2");
        let app = routes::route(Router::new(), &model);
        let server = TestServer::try_new(app).unwrap();
        server.get("/v2/Note").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _) = create_test_server();
        let body: Value = server.get("/health").await.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "model-rest");
    }
}
