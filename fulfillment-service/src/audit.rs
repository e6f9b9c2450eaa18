//! System log (audit trail)
//!
//! Every component records its significant outcomes here. Details are run
//! through the PII redactor before they reach the sink, and a sink failure is
//! only ever logged: auditing never fails the operation being audited.

use std::sync::Arc;

use logger_redacted::PiiRedactor;
use tracing::warn;

use crate::models::SystemLogEntry;
use crate::store::SystemLogSink;

/// Action names written to `system_logs.action`
pub mod actions {
    pub const PRESCRIPTION_SUBMITTED: &str = "prescription_submitted";
    pub const PHARMACY_SUBMISSION_FAILED: &str = "pharmacy_submission_failed";
    pub const PRESCRIPTION_PERSIST_FAILED: &str = "prescription_persist_failed";
    pub const DOCUMENT_ATTACHMENT_FAILED: &str = "document_attachment_failed";
    pub const STATUS_UPDATED: &str = "prescription_status_updated";
    pub const STATUS_NOT_FOUND: &str = "prescription_status_not_found";
    pub const STATUS_REJECTED: &str = "prescription_status_rejected";
    pub const STATUS_INVALID: &str = "prescription_status_invalid";
    pub const STATUS_UPDATE_FAILED: &str = "prescription_status_update_failed";
    pub const STORE_DEGRADED: &str = "store_degraded";
    pub const BACKEND_AMBIGUOUS: &str = "pharmacy_backend_ambiguous";
    pub const BACKEND_CREATED: &str = "pharmacy_backend_created";
    pub const BACKEND_ACTIVATION_CHANGED: &str = "pharmacy_backend_activation_changed";
    pub const TIER_CREATED: &str = "tier_created";
    pub const TIER_UPDATED: &str = "tier_updated";
    pub const TIER_DELETED: &str = "tier_deleted";
    pub const PROVIDER_TIER_ASSIGNED: &str = "provider_tier_assigned";
    pub const PROVIDER_TIER_REMOVED: &str = "provider_tier_removed";
}

/// Handle shared by every component that writes system log entries
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn SystemLogSink>,
    redactor: PiiRedactor,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn SystemLogSink>, redactor: PiiRedactor) -> Self {
        Self { sink, redactor }
    }

    /// Redact and append `entry`. Sink errors are logged and swallowed.
    pub async fn record(&self, mut entry: SystemLogEntry) {
        entry.details = self.redactor.redact_json(&entry.details);
        if let Err(e) = self.sink.append(&entry).await {
            warn!(
                action = %entry.action,
                queue_id = ?entry.queue_id,
                error = %e,
                "Failed to write system log entry"
            );
        }
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("redactor", &self.redactor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::models::LogStatus;
    use crate::store::InMemorySystemLogSink;
    use async_trait::async_trait;
    use logger_redacted::RedactionConfig;
    use serde_json::json;

    struct BrokenSink;

    #[async_trait]
    impl SystemLogSink for BrokenSink {
        async fn append(&self, _entry: &SystemLogEntry) -> StoreResult<()> {
            Err(StoreError::Unavailable("system_logs is gone".into()))
        }
    }

    #[tokio::test]
    async fn details_are_redacted_before_append() {
        let sink = Arc::new(InMemorySystemLogSink::new());
        let audit = AuditTrail::new(
            sink.clone(),
            PiiRedactor::new(RedactionConfig {
                hash_for_correlation: false,
                ..Default::default()
            }),
        );

        audit
            .record(
                SystemLogEntry::new(actions::PRESCRIPTION_SUBMITTED, LogStatus::Success)
                    .with_queue_id("Q-1")
                    .with_details(json!({ "patient_email": "pat@example.com", "api_key": "secret" })),
            )
            .await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].queue_id.as_deref(), Some("Q-1"));
        assert_eq!(entries[0].details["patient_email"], "p***@e***");
        assert_eq!(entries[0].details["api_key"], "[REDACTED]");
    }

    #[tokio::test]
    async fn sink_failure_does_not_propagate() {
        let audit = AuditTrail::new(Arc::new(BrokenSink), PiiRedactor::default());
        audit
            .record(SystemLogEntry::new(actions::STORE_DEGRADED, LogStatus::Warning))
            .await;
    }
}
