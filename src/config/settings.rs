//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub downstream: DownstreamConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Logical name used in the registry and the health document
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Human readable name used in the liveness text
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_service_name() -> String {
    "api-gateway".to_string()
}

fn default_display_name() -> String {
    "API Gateway".to_string()
}

/// Which store implementation backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Durable store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

/// The downstream service reached through the proxy prefix
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownstreamConfig {
    #[serde(default = "default_downstream_name")]
    pub name: String,
    #[serde(default = "default_downstream_display_name")]
    pub display_name: String,
    #[serde(default = "default_downstream_url")]
    pub base_url: String,
    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_downstream_name() -> String {
    "user-service".to_string()
}

fn default_downstream_display_name() -> String {
    "User service".to_string()
}

fn default_downstream_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_proxy_prefix() -> String {
    "/users".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_connect_timeout() -> u64 {
    2000
}

impl DownstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `{display_name} unavailable`, the body of every proxy failure
    pub fn unavailable_message(&self) -> String {
        format!("{} unavailable", self.display_name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        let path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "config/default".to_string());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("database.backend", "postgres")?
            .set_default("downstream.base_url", default_downstream_url())?
            .set_default("logging.level", default_log_level())?
            // Load from configuration file
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with GATEWAY__)
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Conventional deployment variables win over everything else
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("downstream.base_url", std::env::var("USER_SERVICE_URL").ok())?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.database.backend == StoreBackend::Postgres
            && self.database.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(invalid("database.url is required for the postgres backend"));
        }

        let downstream = &self.downstream;
        if downstream.name.is_empty() {
            return Err(invalid("Downstream name cannot be empty"));
        }
        match reqwest::Url::parse(&downstream.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(invalid(format!(
                    "Downstream '{}' has invalid base_url '{}'",
                    downstream.name, downstream.base_url
                )))
            }
        }
        if !downstream.proxy_prefix.starts_with('/')
            || downstream.proxy_prefix.len() < 2
            || downstream.proxy_prefix.ends_with('/')
        {
            return Err(invalid(format!(
                "Proxy prefix '{}' must start with '/' and must not end with '/'",
                downstream.proxy_prefix
            )));
        }
        if downstream.timeout_ms == 0 || downstream.connect_timeout_ms == 0 {
            return Err(invalid("Downstream timeouts must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                service_name: default_service_name(),
                display_name: default_display_name(),
            },
            database: DatabaseConfig {
                backend: default_backend(),
                url: None,
                max_connections: default_max_connections(),
                acquire_timeout_ms: default_acquire_timeout(),
                run_migrations: true,
            },
            downstream: DownstreamConfig {
                name: default_downstream_name(),
                display_name: default_downstream_display_name(),
                base_url: default_downstream_url(),
                proxy_prefix: default_proxy_prefix(),
                health_path: default_health_path(),
                timeout_ms: default_timeout(),
                connect_timeout_ms: default_connect_timeout(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
