use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fulfillment_service::{NewTier, Tier, TierChanges};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{api_success, ApiResponse, ApiResult};
use crate::handlers::RequestActor;
use crate::server::FulfillmentServer;
use crate::validation::RequestValidation;
use crate::{validate_length, validate_required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTierRequest {
    pub tier_name: String,
    pub tier_code: String,
    /// 0 to 100, stored with two decimals
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl RequestValidation for CreateTierRequest {
    fn validate(&self) -> Result<(), crate::error::ApiError> {
        validate_required!(self.tier_name, "tierName is required");
        validate_required!(self.tier_code, "tierCode is required");
        validate_length!(self.tier_name, 1, 100, "tierName must be at most 100 characters");
        validate_length!(self.tier_code, 1, 50, "tierCode must be at most 50 characters");
        Ok(())
    }
}

/// Only the fields present are changed; an empty description clears it
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTierRequest {
    pub tier_name: Option<String>,
    pub tier_code: Option<String>,
    pub discount_percentage: Option<Decimal>,
    pub description: Option<String>,
}

impl RequestValidation for UpdateTierRequest {
    fn validate(&self) -> Result<(), crate::error::ApiError> {
        if let Some(ref name) = self.tier_name {
            validate_length!(name, 1, 100, "tierName must be between 1 and 100 characters");
        }
        if let Some(ref code) = self.tier_code {
            validate_length!(code, 1, 50, "tierCode must be between 1 and 50 characters");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierResponse {
    pub id: Uuid,
    pub tier_name: String,
    pub tier_code: String,
    pub discount_percentage: Decimal,
    pub description: Option<String>,
    /// `"<name> (<pct>%)"`
    pub tier_level: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tier> for TierResponse {
    fn from(tier: Tier) -> Self {
        Self {
            tier_level: tier.label(),
            id: tier.id,
            tier_name: tier.name,
            tier_code: tier.code,
            discount_percentage: tier.discount_percentage,
            description: tier.description,
            created_at: tier.created_at,
            updated_at: tier.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

pub async fn list_tiers(
    State(server): State<FulfillmentServer>,
) -> ApiResult<Json<ApiResponse<Vec<TierResponse>>>> {
    let tiers = server.catalog.list_tiers().await?;
    Ok(Json(api_success(tiers.into_iter().map(TierResponse::from).collect())))
}

pub async fn create_tier(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<CreateTierRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TierResponse>>)> {
    let Json(request) = payload?;
    request.validate()?;

    let new_tier = NewTier::new(
        &request.tier_name,
        &request.tier_code,
        request.discount_percentage,
        request.description.as_deref(),
    )?;
    let tier = server.catalog.create_tier(new_tier, &actor).await?;
    Ok((StatusCode::CREATED, Json(api_success(tier.into()))))
}

pub async fn get_tier(
    State(server): State<FulfillmentServer>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ApiResponse<TierResponse>>> {
    let Path(id) = id?;
    let tier = server.catalog.get_tier(id).await?;
    Ok(Json(api_success(tier.into())))
}

pub async fn get_tier_by_code(
    State(server): State<FulfillmentServer>,
    Path(code): Path<String>,
) -> ApiResult<Json<ApiResponse<TierResponse>>> {
    let tier = server.catalog.get_tier_by_code(&code).await?;
    Ok(Json(api_success(tier.into())))
}

pub async fn update_tier(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTierRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<TierResponse>>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    request.validate()?;

    let changes = TierChanges::new(
        request.tier_name.as_deref(),
        request.tier_code.as_deref(),
        request.discount_percentage,
        request.description.as_deref(),
    )?;
    let tier = server.catalog.update_tier(id, changes, &actor).await?;
    Ok(Json(api_success(tier.into())))
}

pub async fn delete_tier(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ApiResponse<DeletedResponse>>> {
    let Path(id) = id?;
    server.catalog.delete_tier(id, &actor).await?;
    Ok(Json(api_success(DeletedResponse { id, deleted: true })))
}
