use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::audit::{actions, AuditTrail};
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::models::{LogStatus, PrescriptionStatus, SystemLogEntry};
use crate::store::{PrescriptionStore, StatusChange};

/// Inbound status callback from the pharmacy system
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusCallback {
    pub queue_id: String,
    pub new_status: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// Acknowledgement body. Unknown queue ids are reported here, never as an
/// error status, so the sender can retry freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookAck {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Applies pharmacy status callbacks to recorded prescriptions.
///
/// By default the last delivered status wins, even when it moves the
/// lifecycle backwards. With `enforce_monotonic` a backwards update is refused
/// and acknowledged with `success: false`.
pub struct StatusWebhookProcessor {
    prescriptions: Arc<dyn PrescriptionStore>,
    audit: AuditTrail,
    enforce_monotonic: bool,
}

impl StatusWebhookProcessor {
    pub fn new(
        prescriptions: Arc<dyn PrescriptionStore>,
        audit: AuditTrail,
        enforce_monotonic: bool,
    ) -> Self {
        Self {
            prescriptions,
            audit,
            enforce_monotonic,
        }
    }

    /// # Errors
    ///
    /// [`FulfillmentError::Validation`] for a blank queue id or a status outside
    /// the lifecycle; store failures are propagated so the sender retries. Both
    /// are written to the system log before returning.
    pub async fn handle(&self, callback: StatusCallback) -> FulfillmentResult<WebhookAck> {
        let queue_id = callback.queue_id.trim();
        let status = match Self::parse(queue_id, &callback.new_status) {
            Ok(status) => status,
            Err(e) => {
                warn!(queue_id, new_status = %callback.new_status, error = %e, "Invalid status callback");
                let details = json!({
                    "new_status": callback.new_status,
                    "error": e.to_string(),
                });
                self.log(actions::STATUS_INVALID, LogStatus::Error, queue_id, details)
                    .await;
                return Err(e);
            }
        };
        let tracking_number = callback
            .tracking_number
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let change = match self
            .prescriptions
            .apply_status(queue_id, status, tracking_number, self.enforce_monotonic)
            .await
        {
            Ok(change) => change,
            Err(e) => {
                warn!(queue_id, status = %status, error = %e, "Status update could not be stored");
                let details = json!({
                    "new_status": status,
                    "tracking_number": tracking_number,
                    "error": e.to_string(),
                });
                self.log(actions::STATUS_UPDATE_FAILED, LogStatus::Error, queue_id, details)
                    .await;
                return Err(e.into());
            }
        };

        let details = json!({
            "new_status": status,
            "tracking_number": tracking_number,
        });

        match change {
            StatusChange::Applied(prescription) => {
                info!(queue_id, prescription_id = %prescription.id, status = %status, "Prescription status updated");
                self.log(actions::STATUS_UPDATED, LogStatus::Success, queue_id, details)
                    .await;
                Ok(WebhookAck::ok())
            }
            StatusChange::NotFound => {
                warn!(queue_id, status = %status, "Status update for unknown queue id");
                self.log(actions::STATUS_NOT_FOUND, LogStatus::Warning, queue_id, details)
                    .await;
                Ok(WebhookAck::failed("Prescription not found"))
            }
            StatusChange::Rejected { current } => {
                warn!(queue_id, status = %status, current = %current, "Backwards status update refused");
                let mut details = details;
                details["current_status"] = json!(current);
                self.log(actions::STATUS_REJECTED, LogStatus::Warning, queue_id, details)
                    .await;
                Ok(WebhookAck::failed(format!(
                    "Status cannot move from {current} back to {status}"
                )))
            }
        }
    }

    fn parse(queue_id: &str, new_status: &str) -> FulfillmentResult<PrescriptionStatus> {
        if queue_id.is_empty() {
            return Err(FulfillmentError::Validation("queue_id is required".into()));
        }
        new_status.trim().parse()
    }

    /// A blank queue id is logged without one
    async fn log(&self, action: &str, status: LogStatus, queue_id: &str, details: serde_json::Value) {
        let mut entry = SystemLogEntry::new(action, status).with_details(details);
        if !queue_id.is_empty() {
            entry = entry.with_queue_id(queue_id);
        }
        self.audit.record(entry).await;
    }
}

impl std::fmt::Debug for StatusWebhookProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusWebhookProcessor")
            .field("enforce_monotonic", &self.enforce_monotonic)
            .finish_non_exhaustive()
    }
}
