//! Postgres store using sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{info, warn};

use super::{
    AuditLogEntry, GatewayStore, NewAuditEntry, ServiceRecord, ServiceStatus, ServiceUpsert,
    StoreError, StoreResult,
};
use crate::config::DatabaseConfig;

const AUDIT_COLUMNS: &str =
    "id, method, path, status, duration_ms, user_agent, client_address, created_at";

const SERVICE_COLUMNS: &str = "name, base_url, status, last_checked_at, created_at";

#[derive(FromRow)]
struct AuditRow {
    id: i64,
    method: String,
    path: String,
    status: i32,
    duration_ms: i64,
    user_agent: Option<String>,
    client_address: String,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            method: row.method,
            path: row.path,
            status: row.status,
            duration_ms: row.duration_ms,
            user_agent: row.user_agent,
            client_address: row.client_address,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ServiceRow {
    name: String,
    base_url: String,
    status: String,
    last_checked_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ServiceRow> for ServiceRecord {
    fn from(row: ServiceRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|_| {
            warn!(service = %row.name, status = %row.status, "Unrecognised stored status");
            ServiceStatus::Unknown
        });
        Self {
            name: row.name,
            base_url: row.base_url,
            status,
            last_checked_at: row.last_checked_at,
            created_at: row.created_at,
        }
    }
}

/// Classify a driver error once, here, so callers only see `StoreError`
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        other => StoreError::Unknown(other.to_string()),
    }
}

/// Store backed by a shared Postgres connection pool
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Open a pool for `config.url`
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unknown("database.url is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .idle_timeout(Duration::from_secs(600))
            .connect(url)
            .await
            .map_err(classify)?;

        info!(max_connections = config.max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }

    /// Apply the bundled migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unknown(e.to_string()))
    }
}

#[async_trait]
impl GatewayStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> StoreResult<AuditLogEntry> {
        let sql = format!(
            "INSERT INTO gateway_audit_log (method, path, status, duration_ms, user_agent, client_address) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            AUDIT_COLUMNS
        );
        sqlx::query_as::<_, AuditRow>(&sql)
            .bind(&entry.method)
            .bind(&entry.path)
            .bind(entry.status)
            .bind(entry.duration_ms)
            .bind(&entry.user_agent)
            .bind(&entry.client_address)
            .fetch_one(&self.pool)
            .await
            .map(AuditLogEntry::from)
            .map_err(classify)
    }

    async fn recent_audit_entries(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        let sql = format!(
            "SELECT {} FROM gateway_audit_log ORDER BY created_at DESC, id DESC LIMIT $1",
            AUDIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }

    async fn upsert_service(&self, service: ServiceUpsert) -> StoreResult<ServiceRecord> {
        let sql = format!(
            "INSERT INTO gateway_services (name, base_url, status, last_checked_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (name) DO UPDATE SET \
                 base_url = EXCLUDED.base_url, \
                 status = EXCLUDED.status, \
                 last_checked_at = EXCLUDED.last_checked_at \
             RETURNING {}",
            SERVICE_COLUMNS
        );
        sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(&service.name)
            .bind(&service.base_url)
            .bind(service.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map(ServiceRecord::from)
            .map_err(classify)
    }

    async fn get_service(&self, name: &str) -> StoreResult<Option<ServiceRecord>> {
        let sql = format!("SELECT {} FROM gateway_services WHERE name = $1", SERVICE_COLUMNS);
        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(row.map(ServiceRecord::from))
    }

    async fn list_services(&self) -> StoreResult<Vec<ServiceRecord>> {
        let sql = format!("SELECT {} FROM gateway_services ORDER BY name ASC", SERVICE_COLUMNS);
        let rows = sqlx::query_as::<_, ServiceRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(ServiceRecord::from).collect())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed Postgres pool");
    }
}
