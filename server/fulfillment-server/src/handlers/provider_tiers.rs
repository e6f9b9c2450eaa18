use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use fulfillment_service::{DiscountResolution, ProviderTierAssignment, ProviderTierView};
use serde::{Deserialize, Serialize};

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::handlers::RequestActor;
use crate::server::FulfillmentServer;
use crate::validation::RequestValidation;
use crate::{validate_length, validate_required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTierRequest {
    pub provider_id: String,
    /// Stored as given (normalized), even when no tier carries it yet
    pub tier_code: String,
}

impl RequestValidation for AssignTierRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.provider_id, "providerId is required");
        validate_required!(self.tier_code, "tierCode is required");
        validate_length!(self.tier_code, 1, 50, "tierCode must be at most 50 characters");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub provider_id: String,
    pub tier_code: String,
}

impl From<ProviderTierAssignment> for AssignmentResponse {
    fn from(assignment: ProviderTierAssignment) -> Self {
        Self {
            provider_id: assignment.provider_id,
            tier_code: assignment.tier_code,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedResponse {
    pub provider_id: String,
    pub removed: bool,
}

pub async fn list_assignments(
    State(server): State<FulfillmentServer>,
) -> ApiResult<Json<ApiResponse<Vec<AssignmentResponse>>>> {
    let assignments = server.catalog.list_assignments().await?;
    Ok(Json(api_success(
        assignments.into_iter().map(AssignmentResponse::from).collect(),
    )))
}

/// Last write wins per provider
pub async fn assign_tier(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<AssignTierRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<AssignmentResponse>>> {
    let Json(request) = payload?;
    request.validate()?;

    let assignment = server
        .catalog
        .assign(&request.provider_id, &request.tier_code, &actor)
        .await?;
    Ok(Json(api_success(assignment.into())))
}

/// `{tier_level, tier_code}`; an unassigned provider or a code without a
/// tier reads as `"Not set"`
pub async fn get_provider_tier(
    State(server): State<FulfillmentServer>,
    Path(provider_id): Path<String>,
) -> ApiResult<Json<ProviderTierView>> {
    Ok(Json(server.pricing.provider_tier(provider_id.trim()).await?))
}

pub async fn remove_assignment(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    Path(provider_id): Path<String>,
) -> ApiResult<Json<ApiResponse<RemovedResponse>>> {
    let provider_id = provider_id.trim().to_string();
    server.catalog.unassign(&provider_id, &actor).await?;
    Ok(Json(api_success(RemovedResponse {
        provider_id,
        removed: true,
    })))
}

/// Never an error: store failures resolve to `{"status":"not_set"}`
pub async fn get_provider_discount(
    State(server): State<FulfillmentServer>,
    Path(provider_id): Path<String>,
) -> Json<DiscountResolution> {
    Json(server.pricing.resolve_discount(provider_id.trim()).await)
}
