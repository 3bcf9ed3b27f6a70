//! Router construction

use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::middleware::AuditLayer;
use crate::AppState;

/// Build the gateway router.
///
/// The audit layer is outermost so that every request, including CORS
/// preflights, 404s and caught panics, yields exactly one audit entry.
pub fn create_router(state: Arc<AppState>) -> Router {
    let prefix = state.proxy.prefix().to_string();

    Router::new()
        .route("/", get(handlers::root))
        .route("/hello", get(handlers::hello))
        .route("/health", get(handlers::health))
        .route("/api/logs", get(handlers::list_logs))
        .route("/api/services", get(handlers::list_services))
        .route(
            "/api/services/:name",
            get(handlers::get_service).put(handlers::upsert_service),
        )
        .route(&prefix, any(handlers::proxy))
        .route(&format!("{}/", prefix), any(handlers::proxy))
        .route(&format!("{}/*rest", prefix), any(handlers::proxy))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(AuditLayer::new(state.audit.clone()))
        .with_state(state)
}
