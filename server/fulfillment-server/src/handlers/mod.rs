pub mod health;
pub mod pharmacy_backends;
pub mod prescriptions;
pub mod provider_tiers;
pub mod tiers;
pub mod webhooks;

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use fulfillment_service::Actor;

/// Header naming the operator behind an admin call
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";

/// Who to attribute audit entries to. Falls back to the system actor when the
/// caller does not identify itself.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let actor = match header(ACTOR_NAME_HEADER) {
            Some(name) => Actor {
                name,
                email: header(ACTOR_EMAIL_HEADER).unwrap_or_default(),
            },
            None => Actor::system(),
        };
        Ok(Self(actor))
    }
}
