//! Client for the external pharmacy system

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{FulfillmentError, FulfillmentResult};
use crate::models::{PatientDetails, PharmacyBackend, PrescriberDetails, ShippingAddress};

const SUBMIT_PATH: &str = "/api/prescriptions";

/// Upstream bodies longer than this are not echoed back to callers
const MAX_ECHOED_BODY: usize = 300;

/// Order body sent to `POST {base_url}/api/prescriptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PharmacyOrder {
    pub pharmacy_id: String,
    pub store_id: String,
    pub prescriber: PrescriberDetails,
    pub patient: PatientDetails,
    pub medication: MedicationOrder,
    pub shipping: ShippingOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicationOrder {
    pub name: Option<String>,
    pub medication_id: Option<String>,
    pub dosage: Option<String>,
    pub dosage_form: Option<String>,
    pub quantity: i32,
    pub refills: i32,
    pub sig: String,
    pub dispense_as_written: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingOrder {
    pub fee_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ShippingAddress>,
}

/// Acknowledgement of an accepted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PharmacyReceipt {
    pub queue_id: String,
}

/// Some pharmacy systems send the queue id as a JSON number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueueId {
    Text(String),
    Number(serde_json::Number),
}

impl QueueId {
    fn into_trimmed(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default, alias = "queueId")]
    queue_id: Option<QueueId>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl SubmitResponse {
    fn upstream_message(&self) -> Option<String> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PharmacyApiError {
    #[error("pharmacy system did not respond within {0:?}")]
    Timeout(Duration),

    /// Non-success answer. `message` is the upstream text when one was sent.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("malformed pharmacy response: {0}")]
    Malformed(String),

    #[error("pharmacy system unreachable: {0}")]
    Transport(String),
}

impl From<PharmacyApiError> for FulfillmentError {
    fn from(err: PharmacyApiError) -> Self {
        Self::PharmacySubmissionFailed(err.to_string())
    }
}

#[async_trait]
pub trait PharmacyClient: Send + Sync {
    /// Submit one order through `backend`
    async fn submit(
        &self,
        backend: &PharmacyBackend,
        order: &PharmacyOrder,
    ) -> Result<PharmacyReceipt, PharmacyApiError>;
}

/// `reqwest` implementation with a bounded per-request timeout
#[derive(Debug, Clone)]
pub struct HttpPharmacyClient {
    client: reqwest::Client,
    default_base_url: String,
    timeout: Duration,
}

impl HttpPharmacyClient {
    /// # Errors
    ///
    /// [`FulfillmentError::Configuration`] when the HTTP client cannot be built.
    pub fn new(default_base_url: impl Into<String>, timeout: Duration) -> FulfillmentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FulfillmentError::Configuration(format!("pharmacy HTTP client: {e}")))?;

        Ok(Self {
            client,
            default_base_url: default_base_url.into(),
            timeout,
        })
    }

    fn url(&self, backend: &PharmacyBackend) -> String {
        let base = backend
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.default_base_url);
        format!("{}{SUBMIT_PATH}", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl PharmacyClient for HttpPharmacyClient {
    async fn submit(
        &self,
        backend: &PharmacyBackend,
        order: &PharmacyOrder,
    ) -> Result<PharmacyReceipt, PharmacyApiError> {
        let url = self.url(backend);
        debug!(url = %url, pharmacy_id = %order.pharmacy_id, api_key = %backend.api_key.masked(), "Submitting order to pharmacy");

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", backend.api_key.expose())
            .json(order)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PharmacyApiError::Timeout(self.timeout)
                } else {
                    PharmacyApiError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                PharmacyApiError::Timeout(self.timeout)
            } else {
                PharmacyApiError::Transport(e.to_string())
            }
        })?;
        let parsed = serde_json::from_str::<SubmitResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .ok()
                .and_then(SubmitResponse::upstream_message)
                .or_else(|| {
                    let text = body.trim();
                    (!text.is_empty() && text.len() <= MAX_ECHOED_BODY).then(|| text.to_string())
                })
                .unwrap_or_else(|| format!("pharmacy system responded with HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), message = %message, "Pharmacy rejected order");
            return Err(PharmacyApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.map_err(|e| {
            let reason = if e.is_data() {
                format!("unexpected response fields: {e}")
            } else {
                format!("body is not JSON: {e}")
            };
            warn!(status = status.as_u16(), reason = %reason, "Pharmacy answered with an unreadable body");
            PharmacyApiError::Malformed(reason)
        })?;

        if parsed.success == Some(false) {
            return Err(PharmacyApiError::Rejected {
                status: status.as_u16(),
                message: parsed
                    .upstream_message()
                    .unwrap_or_else(|| "pharmacy system reported failure".to_string()),
            });
        }

        match parsed.queue_id.map(QueueId::into_trimmed) {
            Some(queue_id) if !queue_id.is_empty() => Ok(PharmacyReceipt { queue_id }),
            _ => Err(PharmacyApiError::Malformed("response has no queue_id".into())),
        }
    }
}
