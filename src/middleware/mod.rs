//! Middleware module - tower layers applied to the whole router

pub mod audit;

pub use audit::AuditLayer;
