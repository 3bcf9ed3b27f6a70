//! Health aggregation across the local store and the downstream service

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::gateway::registry::ServiceRegistry;
use crate::store::{GatewayStore, ServiceStatus};

/// Combined health document served on `/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub service: String,
    pub status: ServiceStatus,
    pub database: ServiceStatus,
    /// Each downstream's own health body, or a synthesized error record
    pub dependencies: Map<String, Value>,
    pub port: u16,
    pub timestamp: DateTime<Utc>,
}

/// Probes the store and the downstream health endpoint
pub struct HealthAggregator {
    store: Arc<dyn GatewayStore>,
    registry: Arc<ServiceRegistry>,
    client: Client,
    service_name: String,
    port: u16,
    downstream_name: String,
    downstream_base_url: String,
    downstream_health_url: String,
}

impl HealthAggregator {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        registry: Arc<ServiceRegistry>,
        client: Client,
        settings: &Settings,
    ) -> Self {
        let downstream = &settings.downstream;
        let base_url = downstream.base_url.trim_end_matches('/').to_string();
        Self {
            store,
            registry,
            client,
            service_name: settings.server.service_name.clone(),
            port: settings.server.port,
            downstream_name: downstream.name.clone(),
            downstream_health_url: format!("{}{}", base_url, downstream.health_path),
            downstream_base_url: base_url,
        }
    }

    /// Run both probes; never fails
    pub async fn report(&self) -> HealthReport {
        let (database, downstream) = tokio::join!(self.probe_store(), self.probe_downstream());

        self.record_downstream_status(&downstream);

        let mut dependencies = Map::new();
        dependencies.insert(self.downstream_name.clone(), downstream);

        let status = match database {
            ServiceStatus::Healthy => ServiceStatus::Healthy,
            _ => ServiceStatus::Unhealthy,
        };

        HealthReport {
            service: self.service_name.clone(),
            status,
            database,
            dependencies,
            port: self.port,
            timestamp: Utc::now(),
        }
    }

    async fn probe_store(&self) -> ServiceStatus {
        match self.store.ping().await {
            Ok(()) => ServiceStatus::Healthy,
            Err(e) => {
                warn!(backend = self.store.backend(), error = %e, "Store health probe failed");
                ServiceStatus::Unhealthy
            }
        }
    }

    async fn probe_downstream(&self) -> Value {
        let result = async {
            let response = self.client.get(&self.downstream_health_url).send().await?;
            response.json::<Value>().await
        }
        .await;

        match result {
            Ok(body) => {
                debug!(service = %self.downstream_name, "Downstream health probe answered");
                body
            }
            Err(e) => {
                warn!(
                    service = %self.downstream_name,
                    url = %self.downstream_health_url,
                    error = %e,
                    "Downstream health probe failed"
                );
                json!({ "status": "error", "message": "Failed to connect" })
            }
        }
    }

    /// Store the observed downstream status without holding up the report
    fn record_downstream_status(&self, reported: &Value) {
        let status = match reported.get("status").and_then(Value::as_str) {
            Some("healthy") => ServiceStatus::Healthy,
            _ => ServiceStatus::Unhealthy,
        };
        let registry = self.registry.clone();
        let name = self.downstream_name.clone();
        let base_url = self.downstream_base_url.clone();

        tokio::spawn(async move {
            if let Err(e) = registry.upsert(&name, &base_url, status).await {
                warn!(service = %name, error = %e, "Failed to record observed status");
            }
        });
    }
}
