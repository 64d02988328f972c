//! HTTP API for the FleetCare tools.
//!
//! # Endpoints
//!
//! ## Dashboard
//! - `GET /` - Service banner
//! - `GET /health` - Health check
//! - `GET /api/dashboard` - Latest crew report (503 until generated)
//! - `GET /api/run-analysis` - Explains how to produce a report
//!
//! ## Tools
//! - `GET /api/v1/tools` - Tool names, actions and argument schemas
//! - `POST /api/v1/tools/{tool}` - Run an action: `{"action": ..., "args": {...}}`
//!
//! Request bodies are capped (default 1MB). CORS is permissive.

pub mod config;
pub mod report;
pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ApiConfig;
pub use state::AppState;

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = RequestBodyLimitLayer::new(state.config.body_limit_bytes);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        // Dashboard
        .route("/api/dashboard", get(routes::dashboard))
        .route("/api/run-analysis", get(routes::run_analysis))
        // Tools
        .route("/api/v1/tools", get(routes::list_tools))
        .route("/api/v1/tools/{tool}", post(routes::invoke_tool))
        // Middleware
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server on the given address.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting FleetCare API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
