//! Durable catalog of known services and their last observed status

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::store::{GatewayStore, ServiceRecord, ServiceStatus, ServiceUpsert};

/// Registry operations over the shared store
pub struct ServiceRegistry {
    store: Arc<dyn GatewayStore>,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn GatewayStore>) -> Self {
        Self { store }
    }

    /// Create or overwrite the record for `name`
    pub async fn upsert(
        &self,
        name: &str,
        base_url: &str,
        status: ServiceStatus,
    ) -> Result<ServiceRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest(
                "Service name cannot be empty".to_string(),
            ));
        }
        match reqwest::Url::parse(base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(AppError::InvalidRequest(format!(
                    "Invalid base URL '{}'",
                    base_url
                )))
            }
        }

        self.store
            .upsert_service(ServiceUpsert {
                name: name.to_string(),
                base_url: base_url.to_string(),
                status,
            })
            .await
            .map_err(|e| AppError::store("Failed to update service", e))
    }

    /// All records, ordered by name
    pub async fn list(&self) -> Result<Vec<ServiceRecord>> {
        self.store
            .list_services()
            .await
            .map_err(|e| AppError::store("Failed to retrieve services", e))
    }

    pub async fn get(&self, name: &str) -> Result<ServiceRecord> {
        let name = name.trim();
        self.store
            .get_service(name)
            .await
            .map_err(|e| AppError::store("Failed to retrieve service", e))?
            .ok_or_else(|| AppError::NotFound(format!("Service '{}' not found", name)))
    }

    /// Register the downstream service and the gateway itself
    pub async fn bootstrap(&self, settings: &Settings) {
        let own_url = format!("http://localhost:{}", settings.server.port);
        let seeds = [
            (settings.downstream.name.as_str(), settings.downstream.base_url.as_str()),
            (settings.server.service_name.as_str(), own_url.as_str()),
        ];

        for (name, url) in seeds {
            match self.upsert(name, url, ServiceStatus::Healthy).await {
                Ok(record) => info!(service = %record.name, url = %record.base_url, "Registered service"),
                Err(e) => warn!(service = %name, error = %e, "Failed to register service"),
            }
        }
    }
}
