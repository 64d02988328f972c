//! HTTP route handlers for the API.

use crate::report;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleetcare_common::clock::iso_timestamp;
use fleetcare_common::{FleetError, ToolInfo, ToolRequest};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub tools: usize,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ErrorResponse {
    pub fn tool_not_found(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: "TOOL_NOT_FOUND",
            status: StatusCode::NOT_FOUND,
        }
    }
}

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            error: rejection.body_text(),
            code: "INVALID_REQUEST",
            status: rejection.status(),
        }
    }
}

impl From<FleetError> for ErrorResponse {
    fn from(e: FleetError) -> Self {
        match e {
            FleetError::NotFound(message) => Self::tool_not_found(message),
            other => Self {
                error: other.to_string(),
                code: "INTERNAL_ERROR",
                status: StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Service banner.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "FleetCare backend API is running. Access endpoints at /api/dashboard",
        "frontend": state.config.frontend_url,
    }))
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        tools: state.registry.names().len(),
    })
}

/// Serve the crew report, or 503 until one has been generated.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Response {
    let report = report::load_report(&state.config.report_path).await;
    if report::is_empty(&report) {
        warn!(path = %state.config.report_path.display(), "Dashboard requested before report exists");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "report_text": "Crew report not yet generated. Run main.py first.",
                "timestamp": iso_timestamp(state.clock.as_ref()),
            })),
        )
            .into_response();
    }
    Json(report).into_response()
}

/// Analysis runs happen outside the server; this only says so.
pub async fn run_analysis(State(state): State<Arc<AppState>>) -> Json<Value> {
    info!("Analysis run requested");
    Json(json!({
        "status": "info",
        "message": "Please run main.py manually to generate the CrewAI report.",
        "timestamp": iso_timestamp(state.clock.as_ref()),
    }))
}

/// Describe every registered tool.
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolInfo>> {
    Json(state.registry.list())
}

/// Run one tool action. Action failures are returned as 200 error payloads;
/// only an unknown tool is an HTTP error.
pub async fn invoke_tool(
    State(state): State<Arc<AppState>>,
    Path(tool): Path<String>,
    body: Result<Json<ToolRequest>, JsonRejection>,
) -> Result<Json<Value>, ErrorResponse> {
    let Json(request) = body.map_err(|rejection| {
        warn!(tool = %tool, error = %rejection.body_text(), "Rejected tool request body");
        ErrorResponse::from(rejection)
    })?;
    debug!(tool = %tool, action = %request.action, "Tool request");
    let payload = state.registry.invoke(&tool, &request).await?;
    Ok(Json(payload))
}
