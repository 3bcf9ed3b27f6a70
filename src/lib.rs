//! Service Gateway
//!
//! A front-facing HTTP gateway that audit-logs every request, reverse-proxies a
//! path namespace to a downstream service, aggregates health across the local
//! store and that service, and keeps a durable registry of known services.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod store;

pub use error::{AppError, Result};

use reqwest::Client;
use std::sync::Arc;

use gateway::{
    audit::AuditLogger, health_check::HealthAggregator, proxy::ReverseProxy,
    registry::ServiceRegistry,
};
use store::GatewayStore;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub audit: AuditLogger,
    pub registry: Arc<ServiceRegistry>,
    pub proxy: Arc<ReverseProxy>,
    pub health: Arc<HealthAggregator>,
}

impl AppState {
    /// Wire every component to the one injected store
    pub fn new(settings: config::Settings, store: Arc<dyn GatewayStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.downstream.timeout())
            .connect_timeout(settings.downstream.connect_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let registry = Arc::new(ServiceRegistry::new(store.clone()));
        let proxy = Arc::new(ReverseProxy::new(client.clone(), &settings.downstream));
        let health = Arc::new(HealthAggregator::new(
            store.clone(),
            registry.clone(),
            client,
            &settings,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            audit: AuditLogger::new(store),
            registry,
            proxy,
            health,
        })
    }
}
