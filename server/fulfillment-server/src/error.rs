use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::{codes, ErrorCode};
use fulfillment_service::{FulfillmentError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    /// Human-readable message; upstream pharmacy messages are passed through
    pub error: String,
    pub error_type: String,
    pub error_code: String,
    /// Correlates the response with the server log line
    pub error_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Success envelope for admin endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, code: ErrorCode },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    BackendNotConfigured { message: String },

    #[error("{message}")]
    PharmacySubmissionFailed { message: String },

    #[error("{message}")]
    Internal { message: String, code: ErrorCode },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: codes::validation::INVALID_INPUT,
        }
    }

    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: codes::validation::MISSING_REQUIRED_FIELD,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            code: codes::system::INTERNAL,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::BackendNotConfigured { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PharmacySubmissionFailed { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Unauthorized { .. } => "authentication_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "duplicate_key",
            ApiError::BackendNotConfigured { .. } => "backend_not_configured",
            ApiError::PharmacySubmissionFailed { .. } => "pharmacy_submission_failed",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            ApiError::Validation { code, .. } | ApiError::Internal { code, .. } => *code,
            ApiError::Unauthorized { .. } => codes::authentication::INVALID_WEBHOOK_TOKEN,
            ApiError::NotFound { .. } => codes::store::NOT_FOUND,
            ApiError::Conflict { .. } => codes::store::DUPLICATE_KEY,
            ApiError::BackendNotConfigured { .. } => codes::pharmacy::BACKEND_NOT_CONFIGURED,
            ApiError::PharmacySubmissionFailed { .. } => codes::pharmacy::SUBMISSION_FAILED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                error_code = %self.error_code(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let body = ApiErrorResponse {
            success: false,
            error: self.to_string(),
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            error_id,
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        let message = err.to_string();
        match err {
            FulfillmentError::Validation(message) => ApiError::validation(message),
            FulfillmentError::BackendNotConfigured { .. } => {
                ApiError::BackendNotConfigured { message }
            }
            // The upstream message goes to the caller verbatim
            FulfillmentError::PharmacySubmissionFailed(message) => {
                ApiError::PharmacySubmissionFailed { message }
            }
            FulfillmentError::Persistence { .. } => ApiError::Internal {
                message,
                code: codes::pharmacy::PERSISTENCE_FAILED,
            },
            FulfillmentError::Configuration(_) => ApiError::Internal {
                message,
                code: codes::system::CONFIGURATION,
            },
            FulfillmentError::Attachment(_) => ApiError::internal(message),
            FulfillmentError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::Duplicate(_) => ApiError::Conflict { message },
            StoreError::NotFound(_) => ApiError::NotFound { message },
            StoreError::Unavailable(_) => ApiError::Internal {
                message,
                code: codes::store::UNAVAILABLE,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation {
            message: rejection.body_text(),
            code: codes::validation::INVALID_FORMAT,
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation {
            message: rejection.body_text(),
            code: codes::validation::INVALID_FORMAT,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation {
            message: rejection.body_text(),
            code: codes::validation::INVALID_FORMAT,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
