//! Store module - the durable store behind audit logging and the registry

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{AuditLogEntry, NewAuditEntry, ServiceRecord, ServiceStatus, ServiceUpsert};
pub use postgres::PostgresStore;

/// Storage failure, classified by the backend that produced it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Unknown(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Operations the gateway needs from its durable store.
///
/// Implementations provide their own concurrency safety: `upsert_service`
/// must be atomic per name and reads must never observe a partial write.
#[async_trait]
pub trait GatewayStore: Send + Sync {
    /// Short backend name used in logs
    fn backend(&self) -> &'static str;

    /// Trivial liveness query
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry>;

    /// Up to `limit` entries, newest first
    async fn recent_audit_entries(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>>;

    /// Insert or overwrite the record named `service.name`
    async fn upsert_service(&self, service: ServiceUpsert) -> StoreResult<ServiceRecord>;

    async fn get_service(&self, name: &str) -> StoreResult<Option<ServiceRecord>>;

    /// All records ordered by name ascending
    async fn list_services(&self) -> StoreResult<Vec<ServiceRecord>>;

    /// Release connections at process shutdown
    async fn close(&self) {}
}
