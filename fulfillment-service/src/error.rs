use thiserror::Error;

use database_layer::{classify, violated_constraint, FailureKind};

/// Failure of a persistence backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend could not answer at all. Resilient stores fail over on this variant only.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match classify(&err) {
            FailureKind::UniqueViolation => Self::Duplicate(
                violated_constraint(&err).unwrap_or_else(|| "unique constraint".to_string()),
            ),
            FailureKind::RowNotFound => Self::NotFound(err.to_string()),
            FailureKind::Unavailable => Self::Unavailable(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unavailable(format!("corrupt store document: {err}"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No active pharmacy backend for system type '{system_type}'{}", pharmacy_suffix(.pharmacy_id))]
    BackendNotConfigured {
        system_type: String,
        pharmacy_id: Option<String>,
    },

    #[error("Pharmacy submission failed: {0}")]
    PharmacySubmissionFailed(String),

    /// The pharmacy accepted the order but the local record could not be written
    #[error("Pharmacy accepted order {queue_id} but it could not be recorded: {message}")]
    Persistence { queue_id: String, message: String },

    #[error("Document attachment failed: {0}")]
    Attachment(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

fn pharmacy_suffix(pharmacy_id: &Option<String>) -> String {
    pharmacy_id
        .as_deref()
        .map(|p| format!(" and pharmacy '{p}'"))
        .unwrap_or_default()
}
