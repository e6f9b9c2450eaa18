//! Fulfillment Server - HTTP API for prescription submission and pharmacy
//! fulfillment tracking
//!
//! Routes cover discount tier administration, provider tier assignment,
//! prescription submission and lookup, pharmacy backend administration, and
//! the inbound status webhook used by the pharmacy system.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod validation;

pub use config::{ConfigError, ServerConfig, StorageMode};
pub use error::*;
pub use server::FulfillmentServer;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router with all routes and middleware
pub fn create_app(server: FulfillmentServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(server)
}
