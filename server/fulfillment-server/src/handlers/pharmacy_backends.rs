use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fulfillment_service::{ApiKey, NewPharmacyBackend, PharmacyBackend};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::handlers::RequestActor;
use crate::server::FulfillmentServer;
use crate::validation::RequestValidation;
use crate::{validate_http_url, validate_length, validate_required};

#[derive(Deserialize)]
pub struct RegisterBackendRequest {
    pub pharmacy_id: String,
    pub store_id: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Defaults to `PHARMACY_SYSTEM_TYPE`
    #[serde(default)]
    pub system_type: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl RequestValidation for RegisterBackendRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.pharmacy_id, "pharmacy_id is required");
        validate_required!(self.store_id, "store_id is required");
        validate_required!(self.api_key, "api_key is required");
        validate_length!(self.pharmacy_id, 1, 100, "pharmacy_id must be at most 100 characters");
        validate_length!(self.store_id, 1, 100, "store_id must be at most 100 characters");
        if let Some(ref url) = self.base_url {
            validate_http_url!(url, "base_url must be an http(s) URL");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    pub is_active: bool,
}

/// Backend as shown to admins; the key is always masked
#[derive(Debug, Serialize)]
pub struct BackendResponse {
    pub id: Uuid,
    pub pharmacy_id: String,
    pub store_id: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub system_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PharmacyBackend> for BackendResponse {
    fn from(backend: PharmacyBackend) -> Self {
        Self {
            api_key: backend.api_key.masked(),
            id: backend.id,
            pharmacy_id: backend.pharmacy_id,
            store_id: backend.store_id,
            base_url: backend.base_url,
            system_type: backend.system_type,
            is_active: backend.is_active,
            created_at: backend.created_at,
            updated_at: backend.updated_at,
        }
    }
}

pub async fn list_backends(
    State(server): State<FulfillmentServer>,
) -> ApiResult<Json<ApiResponse<Vec<BackendResponse>>>> {
    let backends = server.backends.list().await?;
    Ok(Json(api_success(
        backends.into_iter().map(BackendResponse::from).collect(),
    )))
}

pub async fn register_backend(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<RegisterBackendRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BackendResponse>>)> {
    let Json(request) = payload?;
    request.validate()?;

    let system_type = request
        .system_type
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| server.config.pharmacy_system_type.clone());

    let backend = server
        .backends
        .register(
            NewPharmacyBackend {
                pharmacy_id: request.pharmacy_id.trim().to_string(),
                store_id: request.store_id.trim().to_string(),
                api_key: ApiKey::new(request.api_key),
                base_url: request.base_url.map(|u| u.trim_end_matches('/').to_string()),
                system_type,
                is_active: request.is_active,
            },
            &actor,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(api_success(backend.into()))))
}

/// Turning one backend on does not turn the others off
pub async fn set_activation(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ActivationRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<BackendResponse>>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let backend = server
        .backends
        .set_active(id, request.is_active, &actor)
        .await?;
    Ok(Json(api_success(backend.into())))
}
