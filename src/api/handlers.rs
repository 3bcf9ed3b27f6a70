//! HTTP handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use tracing::error;

use crate::api::envelope::ApiResponse;
use crate::error::{AppError, Result};
use crate::gateway::health_check::HealthReport;
use crate::store::{AuditLogEntry, ServiceRecord, ServiceStatus};
use crate::AppState;

/// GET /
pub async fn root(State(state): State<Arc<AppState>>) -> String {
    format!(
        "{} Service - Port {}",
        state.settings.server.display_name, state.settings.server.port
    )
}

/// GET /hello
pub async fn hello() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Hello from API Gateway!"))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.health.report().await)
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// GET /api/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    query: Option<Query<LogsQuery>>,
) -> Result<Json<ApiResponse<Vec<AuditLogEntry>>>> {
    let limit = query.and_then(|Query(q)| q.limit);
    let logs = state
        .audit
        .recent(limit)
        .await
        .map_err(|e| AppError::store("Failed to retrieve logs", e))?;

    Ok(Json(ApiResponse::ok("API logs retrieved successfully", logs)))
}

/// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ServiceRecord>>>> {
    let services = state.registry.list().await?;
    Ok(Json(ApiResponse::ok("Services retrieved successfully", services)))
}

/// GET /api/services/:name
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ServiceRecord>>> {
    let service = state.registry.get(&name).await?;
    Ok(Json(ApiResponse::ok("Service retrieved successfully", service)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertServiceRequest {
    pub base_url: String,
    #[serde(default)]
    pub status: ServiceStatus,
}

/// PUT /api/services/:name
pub async fn upsert_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: std::result::Result<Json<UpsertServiceRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ServiceRecord>>> {
    let Json(body) = body.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let service = state
        .registry
        .upsert(&name, &body.base_url, body.status)
        .await?;
    Ok(Json(ApiResponse::ok("Service updated successfully", service)))
}

/// ANY {prefix} and {prefix}/*
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.proxy.handle(method, uri, headers, body).await
}

/// Fallback for unmatched routes
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Renders a handler panic as a JSON 500
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %detail, "Handler panicked");

    AppError::Internal("Internal server error".to_string()).into_response()
}
