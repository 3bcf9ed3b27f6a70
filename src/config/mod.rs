//! Configuration module - settings loaded from file and environment

pub mod settings;

pub use settings::{
    DatabaseConfig, DownstreamConfig, LoggingConfig, ServerConfig, Settings, StoreBackend,
};
