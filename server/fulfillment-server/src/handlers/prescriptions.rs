use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use fulfillment_service::{Actor, Prescription, PrescriptionFilter, SubmissionOutcome, SubmissionRequest};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse, ApiResult};
use crate::handlers::RequestActor;
use crate::server::FulfillmentServer;

/// `{success: true, prescription_id, queue_id, ...}`. Failures use the common
/// error body, which carries `success: false` and `error`.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: SubmissionOutcome,
}

/// Submit a prescription to the pharmacy and record it. Not idempotent: a
/// retried request creates a second prescription.
pub async fn submit_prescription(
    State(server): State<FulfillmentServer>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmissionResponse>)> {
    let Json(mut request) = payload?;
    // Without either, the prescriber is recorded as the actor
    if request.submitted_by.is_none() && actor != Actor::system() {
        request.submitted_by = Some(actor);
    }

    let outcome = server.submissions.submit(request).await?;
    info!(
        prescription_id = %outcome.prescription_id,
        queue_id = %outcome.queue_id,
        warnings = outcome.warnings.len(),
        "Submission accepted"
    );
    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            success: true,
            outcome,
        }),
    ))
}

pub async fn get_prescription(
    State(server): State<FulfillmentServer>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Prescription>>> {
    let Path(id) = id?;
    let prescription = server
        .prescriptions
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Prescription {id} not found")))?;
    Ok(Json(api_success(prescription)))
}

/// `?queue_id=&status=&prescriber_id=`, all optional
pub async fn list_prescriptions(
    State(server): State<FulfillmentServer>,
    filter: Result<Query<PrescriptionFilter>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<Prescription>>>> {
    let Query(filter) = filter?;
    let prescriptions = server.prescriptions.list(&filter).await?;
    Ok(Json(api_success(prescriptions)))
}
