//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
mod server;

pub use auth::{GATEWAY_KEY_HEADER, GatewayCredentials, USER_ID_HEADER};
pub use handlers::{ApiError, AppState, IDEMPOTENCY_KEY_HEADER};
pub use server::HttpServer;
