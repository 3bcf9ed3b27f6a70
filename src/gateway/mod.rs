//! Gateway module - Audit logging, proxying, health aggregation, and the service registry

pub mod audit;
pub mod health_check;
pub mod proxy;
pub mod registry;
