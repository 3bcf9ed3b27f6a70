//! In-process store, used for local runs without Postgres and in tests

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::{
    AuditLogEntry, GatewayStore, NewAuditEntry, ServiceRecord, ServiceUpsert, StoreResult,
};

/// Volatile store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    audit_log: RwLock<Vec<AuditLogEntry>>,
    services: DashMap<String, ServiceRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit entries held
    pub fn audit_len(&self) -> usize {
        self.audit_log.read().len()
    }
}

#[async_trait]
impl GatewayStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        let mut log = self.audit_log.write();
        let id = log.last().map_or(1, |last| last.id + 1);
        let created_at = match log.last() {
            // keep creation times monotonic even if the wall clock steps back
            Some(last) if last.created_at > Utc::now() => last.created_at,
            _ => Utc::now(),
        };
        let stored = AuditLogEntry {
            id,
            method: entry.method,
            path: entry.path,
            status: entry.status,
            duration_ms: entry.duration_ms,
            user_agent: entry.user_agent,
            client_address: entry.client_address,
            created_at,
        };
        log.push(stored.clone());
        Ok(stored)
    }

    async fn recent_audit_entries(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        let log = self.audit_log.read();
        Ok(log.iter().rev().take(limit).cloned().collect())
    }

    async fn upsert_service(&self, service: ServiceUpsert) -> StoreResult<ServiceRecord> {
        let now = Utc::now();
        let record = self
            .services
            .entry(service.name.clone())
            .and_modify(|existing| {
                existing.base_url = service.base_url.clone();
                existing.status = service.status;
                existing.last_checked_at = now;
            })
            .or_insert_with(|| ServiceRecord {
                name: service.name.clone(),
                base_url: service.base_url.clone(),
                status: service.status,
                last_checked_at: now,
                created_at: now,
            });
        Ok(record.value().clone())
    }

    async fn get_service(&self, name: &str) -> StoreResult<Option<ServiceRecord>> {
        Ok(self.services.get(name).map(|r| r.value().clone()))
    }

    async fn list_services(&self) -> StoreResult<Vec<ServiceRecord>> {
        let mut services: Vec<ServiceRecord> =
            self.services.iter().map(|r| r.value().clone()).collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }
}
