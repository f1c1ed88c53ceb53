//! ServerBuilder for fluent API to build HTTP servers

use super::routes::ModelRest;
use crate::config::ServerConfig;
use anyhow::{Result, bail};
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::collections::HashSet;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Name reported by the health endpoints
pub const SERVICE_NAME: &str = "model-rest";

/// Builder for creating HTTP servers serving one or more models
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .register_model(ModelRest::new("TestModel", InMemoryStore::new()))
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    models: Vec<ModelRest>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            models: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Use bind address and CORS settings from configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a model whose CRUD endpoints will be mounted
    pub fn register_model(mut self, model: ModelRest) -> Self {
        self.models.push(model);
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for routes that don't fit the CRUD pattern, such as login
    /// endpoints or webhooks.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn models(&self) -> &[ModelRest] {
        &self.models
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health routes (`/health`, `/healthz`)
    /// - CRUD routes for every registered model
    /// - Custom routes
    pub fn build(self) -> Result<Router> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.base_path()) {
                bail!(
                    "model '{}' is mounted at '{}', which is already taken",
                    model.name(),
                    model.base_path()
                );
            }
        }

        let mut app = health_routes();
        for model in &self.models {
            app = app.merge(model.routes());
        }
        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        app = app.layer(TraceLayer::new_for_http());
        if self.config.cors {
            app = app.layer(CorsLayer::permissive());
        }

        Ok(app)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Check that every store is reachable, logging the ones that are not
    /// - Bind to the provided address
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    ///
    /// An unreachable store does not stop the server; its requests fail
    /// with `503 STORE_UNAVAILABLE` until it comes back.
    pub async fn serve(self, addr: &str) -> Result<()> {
        for model in &self.models {
            if let Err(e) = model.store().ping().await {
                tracing::error!(
                    model = %model.name(),
                    backend = model.store().backend(),
                    error = %e,
                    "Unable to reach data store"
                );
            }
        }

        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on the configured bind address
    pub async fn serve_configured(self) -> Result<()> {
        let addr = self.config.bind.clone();
        self.serve(&addr).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build health check routes
fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
