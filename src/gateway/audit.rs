//! Best-effort persistence of per-request audit entries

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{AuditLogEntry, GatewayStore, NewAuditEntry, StoreResult};

/// Hard cap on entries returned by a single read
pub const MAX_RECENT_ENTRIES: usize = 100;

/// Writes audit entries without ever failing the request they describe
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn GatewayStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn GatewayStore>) -> Self {
        Self { store }
    }

    /// Persist `entry` on a detached task; the caller never waits on the store
    pub fn record(&self, entry: NewAuditEntry) -> JoinHandle<()> {
        let logger = self.clone();
        tokio::spawn(async move {
            logger.persist(entry).await;
        })
    }

    /// Persist `entry`, absorbing and diagnosing any store fault
    pub async fn persist(&self, entry: NewAuditEntry) {
        let method = entry.method.clone();
        let path = entry.path.clone();
        match self.store.insert_audit_entry(entry).await {
            Ok(stored) => debug!(id = stored.id, method = %method, path = %path, "Audit entry recorded"),
            Err(e) => warn!(
                backend = self.store.backend(),
                method = %method,
                path = %path,
                error = %e,
                "Failed to log request"
            ),
        }
    }

    /// The newest entries, at most `MAX_RECENT_ENTRIES`
    pub async fn recent(&self, limit: Option<usize>) -> StoreResult<Vec<AuditLogEntry>> {
        let limit = limit.unwrap_or(MAX_RECENT_ENTRIES).min(MAX_RECENT_ENTRIES);
        self.store.recent_audit_entries(limit).await
    }
}
