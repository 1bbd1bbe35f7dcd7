//! # noteport-api
//!
//! HTTP boundary for the noteport import pipeline.
//!
//! The router is built by [`router`] so the binary and the integration tests
//! serve exactly the same routes and layers.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use noteport_core::FolderRepository;
use noteport_import::BatchImporter;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub importer: BatchImporter,
    pub folders: Arc<dyn FolderRepository>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        importer: BatchImporter,
        folders: Arc<dyn FolderRepository>,
        config: ServerConfig,
    ) -> Self {
        Self {
            importer,
            folders,
            config: Arc::new(config),
        }
    }
}

/// Build the application router with tracing and body limits applied.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_request_bytes();
    Router::new()
        .route("/health", get(health_check))
        .route("/api/import/onenote", post(handlers::import_onenote))
        .route("/api/import/mht", post(handlers::import_mht))
        .route("/api/import/docx", post(handlers::import_docx))
        .route("/api/import/pdf", post(handlers::import_pdf))
        .route("/api/import/onepkg", post(handlers::import_onepkg))
        .route("/api/import/batch", post(handlers::import_batch))
        .route("/api/import/health", get(handlers::import_health))
        .layer(TraceLayer::new_for_http())
        // Per-file limits are enforced while streaming; this caps the request.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
