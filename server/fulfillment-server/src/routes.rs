pub mod paths;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers::{health, pharmacy_backends, prescriptions, provider_tiers, tiers, webhooks},
    server::FulfillmentServer,
};

pub fn health_routes() -> Router<FulfillmentServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

pub fn tier_routes() -> Router<FulfillmentServer> {
    Router::new()
        .route(paths::tiers::TIERS, get(tiers::list_tiers).post(tiers::create_tier))
        .route(
            paths::tiers::TIER_BY_ID,
            get(tiers::get_tier)
                .put(tiers::update_tier)
                .delete(tiers::delete_tier),
        )
        .route(paths::tiers::TIER_BY_CODE, get(tiers::get_tier_by_code))
}

pub fn provider_tier_routes() -> Router<FulfillmentServer> {
    Router::new()
        .route(
            paths::provider_tiers::ASSIGNMENTS,
            get(provider_tiers::list_assignments).post(provider_tiers::assign_tier),
        )
        .route(
            paths::provider_tiers::BY_PROVIDER,
            get(provider_tiers::get_provider_tier).delete(provider_tiers::remove_assignment),
        )
        .route(
            paths::provider_tiers::DISCOUNT,
            get(provider_tiers::get_provider_discount),
        )
}

pub fn prescription_routes() -> Router<FulfillmentServer> {
    Router::new()
        .route(
            paths::prescriptions::PRESCRIPTIONS,
            get(prescriptions::list_prescriptions).post(prescriptions::submit_prescription),
        )
        .route(
            paths::prescriptions::PRESCRIPTION_BY_ID,
            get(prescriptions::get_prescription),
        )
}

/// Callbacks are authenticated by a shared token, not by user identity
pub fn webhook_routes() -> Router<FulfillmentServer> {
    Router::new().route(
        paths::webhooks::PRESCRIPTION_STATUS,
        post(webhooks::prescription_status),
    )
}

pub fn pharmacy_backend_routes() -> Router<FulfillmentServer> {
    Router::new()
        .route(
            paths::pharmacy_backends::BACKENDS,
            get(pharmacy_backends::list_backends).post(pharmacy_backends::register_backend),
        )
        .route(
            paths::pharmacy_backends::ACTIVATION,
            put(pharmacy_backends::set_activation),
        )
}

fn api_v1_routes() -> Router<FulfillmentServer> {
    Router::new()
        .merge(tier_routes())
        .merge(provider_tier_routes())
        .merge(prescription_routes())
        .merge(webhook_routes())
        .merge(pharmacy_backend_routes())
}

pub fn create_routes() -> Router<FulfillmentServer> {
    Router::new()
        .merge(health_routes())
        .nest(paths::API_V1, api_v1_routes())
}
