//! API module - envelope, handlers, and routes

pub mod envelope;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
