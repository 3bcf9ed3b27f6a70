//! Records persisted by the gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One completed inbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub duration_ms: i64,
    pub user_agent: Option<String>,
    pub client_address: String,
    pub created_at: DateTime<Utc>,
}

/// An audit entry before the store has assigned its id and timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub method: String,
    pub path: String,
    pub status: i32,
    pub duration_ms: i64,
    pub user_agent: Option<String>,
    pub client_address: String,
}

/// Last observed status of a known service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "unhealthy" => Ok(Self::Unhealthy),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown service status '{}'", other)),
        }
    }
}

/// A known downstream service, keyed by `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub name: String,
    pub base_url: String,
    pub status: ServiceStatus,
    pub last_checked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields written by a registry upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUpsert {
    pub name: String,
    pub base_url: String,
    pub status: ServiceStatus,
}
