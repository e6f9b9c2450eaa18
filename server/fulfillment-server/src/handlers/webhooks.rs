use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use fulfillment_service::{StatusCallback, WebhookAck};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::server::FulfillmentServer;

/// Shared secret header checked when `WEBHOOK_SHARED_SECRET` is set
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Pharmacy status callback. Known and unknown queue ids both answer 200;
/// the body's `success` flag tells them apart.
pub async fn prescription_status(
    State(server): State<FulfillmentServer>,
    headers: HeaderMap,
    payload: Result<Json<StatusCallback>, JsonRejection>,
) -> ApiResult<Json<WebhookAck>> {
    authorize(&server.config, &headers)?;
    let Json(callback) = payload?;
    Ok(Json(server.webhooks.handle(callback).await?))
}

fn authorize(config: &ServerConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = config.webhook_secret() else {
        return Ok(());
    };
    let presented = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if bool::from(presented.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        warn!(token_present = !presented.is_empty(), "Webhook rejected: bad token");
        Err(ApiError::unauthorized("invalid or missing webhook token"))
    }
}
