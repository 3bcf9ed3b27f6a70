//! Shared helpers for functional tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use service_gateway::{
    api::create_router,
    config::{Settings, StoreBackend},
    store::{
        AuditLogEntry, GatewayStore, MemoryStore, NewAuditEntry, ServiceRecord, ServiceUpsert,
        StoreError, StoreResult,
    },
    AppState,
};

/// Settings pointing the downstream at `base_url` with short timeouts
pub fn test_settings(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.database.backend = StoreBackend::Memory;
    settings.downstream.base_url = base_url.to_string();
    settings.downstream.timeout_ms = 500;
    settings.downstream.connect_timeout_ms = 250;
    settings
}

/// A downstream address nothing listens on
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub fn build_app(settings: Settings, store: Arc<dyn GatewayStore>) -> Router {
    let state = AppState::new(settings, store).unwrap();
    create_router(Arc::new(state))
}

pub fn memory_app(base_url: &str) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (build_app(test_settings(base_url), store.clone()), store)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Collect a response body into a `serde_json::Value`
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Audit writes are detached; poll until `expected` entries landed
pub async fn wait_for_audit(store: &MemoryStore, expected: usize) {
    for _ in 0..100 {
        if store.audit_len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} audit entries, found {}",
        expected,
        store.audit_len()
    );
}

/// Store whose every operation fails
pub struct FailingStore;

fn down() -> StoreError {
    StoreError::Unknown("connection refused".to_string())
}

#[async_trait]
impl GatewayStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(down())
    }

    async fn insert_audit_entry(&self, _entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        Err(down())
    }

    async fn recent_audit_entries(&self, _limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        Err(down())
    }

    async fn upsert_service(&self, _service: ServiceUpsert) -> StoreResult<ServiceRecord> {
        Err(down())
    }

    async fn get_service(&self, _name: &str) -> StoreResult<Option<ServiceRecord>> {
        Err(down())
    }

    async fn list_services(&self) -> StoreResult<Vec<ServiceRecord>> {
        Err(down())
    }
}

/// Poll until the registry holds a record for `name`
pub async fn wait_for_service(store: &dyn GatewayStore, name: &str) -> ServiceRecord {
    for _ in 0..100 {
        if let Ok(Some(record)) = store.get_service(name).await {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("service {} was never recorded", name);
}

/// In-memory store whose writes stall for `delay` before landing
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl GatewayStore for SlowStore {
    fn backend(&self) -> &'static str {
        "slow"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert_audit_entry(entry).await
    }

    async fn recent_audit_entries(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        self.inner.recent_audit_entries(limit).await
    }

    async fn upsert_service(&self, service: ServiceUpsert) -> StoreResult<ServiceRecord> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert_service(service).await
    }

    async fn get_service(&self, name: &str) -> StoreResult<Option<ServiceRecord>> {
        self.inner.get_service(name).await
    }

    async fn list_services(&self) -> StoreResult<Vec<ServiceRecord>> {
        self.inner.list_services().await
    }
}
