//! Field Authorization Example
//!
//! Serves the `TestModel` described in `model.yaml`:
//! - `_id` and `user` are open to everyone
//! - `text` is visible to everyone but only `?user=admin` may change it
//!
//! ```sh
//! cargo run --example auth_api
//! curl -X POST 'localhost:3000/api/v1/TestModel?user=admin' \
//!      -H 'content-type: application/json' -d '{"_id":1,"user":"user1","text":"text2"}'
//! curl -X PATCH 'localhost:3000/api/v1/TestModel/1?user=user' \
//!      -H 'content-type: application/json' -d '{"text":"ignored"}'
//! curl localhost:3000/api/v1/TestModel/1
//! ```
//!
//! Set `MODEL_REST_CONFIG` to serve another model file.

use anyhow::Result;
use model_rest::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/auth_api/model.yaml");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::var("MODEL_REST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = AppConfig::from_yaml_file(&path)?;

    let store = InMemoryStore::new()
        .with_schema(config.model.schema()?)
        .with_id_field(&config.model.id_field);

    // Trivial identification: the acting user comes from `?user=`
    let hooks = Hooks::new().pre_all(hook_fn("identify", |ctx| {
        if let Some(user) = ctx.query_param("user").map(String::from) {
            ctx.set_user(user);
        }
        Ok(HookOutcome::Next)
    }));

    let model = ModelRest::new(config.model.name.clone(), store)
        .with_prefix(&config.server.base_path)
        .with_auth(config.model.auth()?)
        .with_hooks(hooks);

    tracing::info!(model = %model.name(), base_path = %model.base_path(), "serving model");

    ServerBuilder::new()
        .with_config(config.server)
        .register_model(model)
        .serve_configured()
        .await
}
