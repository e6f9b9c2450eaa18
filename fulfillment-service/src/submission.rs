//! Prescription submission
//!
//! A submission is validated, priced, routed to the active pharmacy backend,
//! sent to the pharmacy system and only then recorded locally. A failed
//! pharmacy call leaves no record behind. A failed document attachment after
//! the record exists is reported as a warning; the submission still succeeds.
//!
//! Retried submissions are not de-duplicated: each accepted call creates a new
//! prescription under the queue id the pharmacy returns.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::audit::{actions, AuditTrail};
use crate::backends::PharmacyBackendRegistry;
use crate::documents::{DocumentStore, DocumentUpload};
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::fees::{dollars_to_cents, oversight_total_cents, resolve_cents, OversightFee};
use crate::models::{
    Actor, LogStatus, PatientDetails, PrescriberDetails, Prescription, PrescriptionStatus,
    ShippingAddress, SystemLogEntry,
};
use crate::pharmacy_api::{MedicationOrder, PharmacyClient, PharmacyOrder, ShippingOrder};
use crate::pricing::{DiscountResolution, PricingResolver};
use crate::store::{ParticipantDirectory, PrescriptionStore};

/// Submission from the prescribing wizard
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest {
    pub prescriber_id: Uuid,
    pub patient_id: Uuid,
    pub encounter_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub medication: Option<String>,
    pub medication_id: Option<String>,
    pub dosage: Option<String>,
    pub dosage_form: Option<String>,
    pub quantity: i64,
    pub refills: i64,
    pub sig: String,
    #[serde(default)]
    pub dispense_as_written: bool,
    pub pharmacy_notes: Option<String>,
    pub pharmacy_id: Option<String>,
    /// Backend family; the service default applies when absent
    pub system_type: Option<String>,
    #[serde(default)]
    pub oversight_fees: Vec<OversightFee>,
    /// Used only when no oversight fee items are sent
    pub profit_cents: Option<i64>,
    /// Dollars
    pub shipping_fee: Option<Decimal>,
    /// Used only when `shipping_fee` is absent
    pub shipping_fee_cents: Option<i64>,
    #[serde(default)]
    pub has_custom_address: bool,
    pub custom_address: Option<ShippingAddress>,
    pub patient: PatientDetails,
    pub prescriber: PrescriberDetails,
    pub document: Option<DocumentUpload>,
    pub submitted_by: Option<Actor>,
}

/// Request fields after validation and fee arithmetic
struct ValidatedSubmission {
    quantity: i32,
    refills: i32,
    profit_cents: i64,
    shipping_fee_cents: i64,
    custom_address: Option<ShippingAddress>,
}

fn non_negative(value: i64, field: &str) -> FulfillmentResult<i32> {
    if value < 0 {
        return Err(FulfillmentError::Validation(format!(
            "{field} must be a non-negative integer"
        )));
    }
    i32::try_from(value)
        .map_err(|_| FulfillmentError::Validation(format!("{field} is too large")))
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

impl SubmissionRequest {
    fn validate(&self) -> FulfillmentResult<ValidatedSubmission> {
        let quantity = non_negative(self.quantity, "quantity")?;
        let refills = non_negative(self.refills, "refills")?;

        if !has_text(self.medication.as_deref()) && !has_text(self.medication_id.as_deref()) {
            return Err(FulfillmentError::Validation(
                "either medication or medication_id is required".into(),
            ));
        }

        let custom_address = if self.has_custom_address {
            Some(self.custom_address.clone().ok_or_else(|| {
                FulfillmentError::Validation(
                    "custom_address is required when has_custom_address is true".into(),
                )
            })?)
        } else {
            None
        };

        let computed_profit =
            (!self.oversight_fees.is_empty()).then(|| oversight_total_cents(&self.oversight_fees));
        let profit_cents = resolve_cents(computed_profit, self.profit_cents, "profit_cents")?;

        let computed_shipping = self
            .shipping_fee
            .map(|dollars| dollars_to_cents(dollars, "shipping fee"));
        let shipping_fee_cents =
            resolve_cents(computed_shipping, self.shipping_fee_cents, "shipping_fee_cents")?;

        Ok(ValidatedSubmission {
            quantity,
            refills,
            profit_cents,
            shipping_fee_cents,
            custom_address,
        })
    }

    fn actor(&self) -> Actor {
        self.submitted_by.clone().unwrap_or_else(|| Actor {
            name: self.prescriber.full_name(),
            email: String::new(),
        })
    }
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub prescription_id: Uuid,
    pub queue_id: String,
    pub status: PrescriptionStatus,
    pub pricing: DiscountResolution,
    pub profit_cents: i64,
    pub shipping_fee_cents: i64,
    pub document_reference: Option<String>,
    /// Non-fatal problems, e.g. a document that could not be attached
    pub warnings: Vec<String>,
}

pub struct SubmissionCoordinator {
    directory: Arc<dyn ParticipantDirectory>,
    pricing: PricingResolver,
    registry: PharmacyBackendRegistry,
    pharmacy: Arc<dyn PharmacyClient>,
    prescriptions: Arc<dyn PrescriptionStore>,
    documents: Arc<dyn DocumentStore>,
    audit: AuditTrail,
    default_system_type: String,
}

impl SubmissionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        pricing: PricingResolver,
        registry: PharmacyBackendRegistry,
        pharmacy: Arc<dyn PharmacyClient>,
        prescriptions: Arc<dyn PrescriptionStore>,
        documents: Arc<dyn DocumentStore>,
        audit: AuditTrail,
        default_system_type: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            pricing,
            registry,
            pharmacy,
            prescriptions,
            documents,
            audit,
            default_system_type: default_system_type.into(),
        }
    }

    /// Run one submission end to end
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::Validation`] for malformed input or unknown participants
    /// - [`FulfillmentError::BackendNotConfigured`] when no active backend matches
    /// - [`FulfillmentError::PharmacySubmissionFailed`] when the pharmacy rejects,
    ///   times out or answers nonsense; nothing is recorded
    /// - [`FulfillmentError::Persistence`] when the pharmacy accepted but the
    ///   local insert failed
    #[instrument(skip(self, request), fields(prescriber_id = %request.prescriber_id, patient_id = %request.patient_id))]
    pub async fn submit(&self, request: SubmissionRequest) -> FulfillmentResult<SubmissionOutcome> {
        let validated = request.validate()?;
        self.ensure_participants(&request).await?;

        let actor = request.actor();
        let pricing = self
            .pricing
            .resolve_discount(&request.prescriber_id.to_string())
            .await;

        let system_type = request
            .system_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.default_system_type);
        let backend = self
            .registry
            .get_active_backend(request.pharmacy_id.as_deref(), system_type)
            .await?;

        let order = PharmacyOrder {
            pharmacy_id: backend.pharmacy_id.clone(),
            store_id: backend.store_id.clone(),
            prescriber: request.prescriber.clone(),
            patient: request.patient.clone(),
            medication: MedicationOrder {
                name: request.medication.clone(),
                medication_id: request.medication_id.clone(),
                dosage: request.dosage.clone(),
                dosage_form: request.dosage_form.clone(),
                quantity: validated.quantity,
                refills: validated.refills,
                sig: request.sig.clone(),
                dispense_as_written: request.dispense_as_written,
                notes: request.pharmacy_notes.clone(),
            },
            shipping: ShippingOrder {
                fee_cents: validated.shipping_fee_cents,
                address: validated.custom_address.clone(),
            },
        };

        let receipt = match self.pharmacy.submit(&backend, &order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(backend_id = %backend.id, error = %e, "Pharmacy submission failed");
                self.audit
                    .record(
                        SystemLogEntry::new(actions::PHARMACY_SUBMISSION_FAILED, LogStatus::Error)
                            .with_actor(&actor)
                            .with_details(json!({
                                "backend_id": backend.id,
                                "pharmacy_id": backend.pharmacy_id,
                                "patient_id": request.patient_id,
                                "error": e.to_string(),
                            })),
                    )
                    .await;
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4(),
            queue_id: receipt.queue_id.clone(),
            status: PrescriptionStatus::Submitted,
            prescriber_id: request.prescriber_id,
            patient_id: request.patient_id,
            encounter_id: request.encounter_id,
            appointment_id: request.appointment_id,
            medication: request.medication.clone(),
            medication_id: request.medication_id.clone(),
            dosage: request.dosage.clone(),
            dosage_form: request.dosage_form.clone(),
            quantity: validated.quantity,
            refills: validated.refills,
            sig: request.sig.clone(),
            dispense_as_written: request.dispense_as_written,
            pharmacy_notes: request.pharmacy_notes.clone(),
            pharmacy_id: Some(backend.pharmacy_id.clone()),
            backend_id: backend.id,
            profit_cents: validated.profit_cents,
            shipping_fee_cents: validated.shipping_fee_cents,
            tracking_number: None,
            custom_address: validated.custom_address,
            submitted_at: now,
            updated_at: now,
        };

        if let Err(e) = self.prescriptions.insert(&prescription).await {
            error!(queue_id = %receipt.queue_id, error = %e, "Pharmacy accepted order but it could not be recorded");
            self.audit
                .record(
                    SystemLogEntry::new(actions::PRESCRIPTION_PERSIST_FAILED, LogStatus::Error)
                        .with_actor(&actor)
                        .with_queue_id(&receipt.queue_id)
                        .with_details(json!({
                            "backend_id": backend.id,
                            "patient_id": request.patient_id,
                            "error": e.to_string(),
                        })),
                )
                .await;
            return Err(FulfillmentError::Persistence {
                queue_id: receipt.queue_id,
                message: e.to_string(),
            });
        }

        info!(prescription_id = %prescription.id, queue_id = %prescription.queue_id, "Prescription submitted");
        self.audit
            .record(
                SystemLogEntry::new(actions::PRESCRIPTION_SUBMITTED, LogStatus::Success)
                    .with_actor(&actor)
                    .with_queue_id(&prescription.queue_id)
                    .with_details(json!({
                        "prescription_id": prescription.id,
                        "backend_id": backend.id,
                        "pharmacy_id": backend.pharmacy_id,
                        "medication": prescription.medication,
                        "medication_id": prescription.medication_id,
                        "quantity": prescription.quantity,
                        "refills": prescription.refills,
                        "profit_cents": prescription.profit_cents,
                        "shipping_fee_cents": prescription.shipping_fee_cents,
                        "discount_percentage": pricing.discount_percentage(),
                    })),
            )
            .await;

        let mut warnings = Vec::new();
        let mut document_reference = None;
        if let Some(document) = &request.document {
            match self.documents.attach(prescription.id, document).await {
                Ok(reference) => document_reference = Some(reference),
                Err(e) => {
                    warn!(prescription_id = %prescription.id, error = %e, "Document attachment failed");
                    self.audit
                        .record(
                            SystemLogEntry::new(actions::DOCUMENT_ATTACHMENT_FAILED, LogStatus::Warning)
                                .with_actor(&actor)
                                .with_queue_id(&prescription.queue_id)
                                .with_details(json!({
                                    "prescription_id": prescription.id,
                                    "file_name": document.file_name,
                                    "error": e.to_string(),
                                })),
                        )
                        .await;
                    warnings.push(format!(
                        "Prescription submitted, but the document could not be attached: {e}"
                    ));
                }
            }
        }

        Ok(SubmissionOutcome {
            prescription_id: prescription.id,
            queue_id: prescription.queue_id,
            status: prescription.status,
            pricing,
            profit_cents: prescription.profit_cents,
            shipping_fee_cents: prescription.shipping_fee_cents,
            document_reference,
            warnings,
        })
    }

    async fn ensure_participants(&self, request: &SubmissionRequest) -> FulfillmentResult<()> {
        if !self.directory.prescriber_exists(request.prescriber_id).await? {
            return Err(FulfillmentError::Validation(format!(
                "prescriber {} does not exist",
                request.prescriber_id
            )));
        }
        if !self.directory.patient_exists(request.patient_id).await? {
            return Err(FulfillmentError::Validation(format!(
                "patient {} does not exist",
                request.patient_id
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("default_system_type", &self.default_system_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::FileSystemDocumentStore;
    use crate::models::{ApiKey, NewPharmacyBackend, NewTier};
    use crate::pharmacy_api::PharmacyApiError;
    use crate::store::{
        AssignmentStore, BackendStore, InMemoryAssignmentStore, InMemoryBackendStore,
        InMemoryDirectory, InMemoryPrescriptionStore, InMemorySystemLogSink, InMemoryTierStore,
        TierStore,
    };
    use crate::test_support::{patient, prescriber, StubPharmacy};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use logger_redacted::PiiRedactor;
    use tempfile::TempDir;

    struct Harness {
        coordinator: SubmissionCoordinator,
        pharmacy: Arc<StubPharmacy>,
        prescriptions: Arc<InMemoryPrescriptionStore>,
        backends: Arc<InMemoryBackendStore>,
        assignments: Arc<InMemoryAssignmentStore>,
        tiers: Arc<InMemoryTierStore>,
        sink: Arc<InMemorySystemLogSink>,
        prescriber_id: Uuid,
        patient_id: Uuid,
        _documents: TempDir,
    }

    impl Harness {
        async fn new(pharmacy: StubPharmacy) -> Self {
            let directory = Arc::new(InMemoryDirectory::new());
            let prescriber_id = Uuid::new_v4();
            let patient_id = Uuid::new_v4();
            directory.add_prescriber(prescriber_id);
            directory.add_patient(patient_id);

            let sink = Arc::new(InMemorySystemLogSink::new());
            let audit = AuditTrail::new(sink.clone(), PiiRedactor::default());
            let assignments = Arc::new(InMemoryAssignmentStore::new());
            let tiers = Arc::new(InMemoryTierStore::new());
            let backends = Arc::new(InMemoryBackendStore::new());
            let prescriptions = Arc::new(InMemoryPrescriptionStore::new());
            let pharmacy = Arc::new(pharmacy);
            let documents = TempDir::new().unwrap();

            let coordinator = SubmissionCoordinator::new(
                directory,
                PricingResolver::new(assignments.clone(), tiers.clone()),
                PharmacyBackendRegistry::new(backends.clone(), audit.clone()),
                pharmacy.clone(),
                prescriptions.clone(),
                Arc::new(FileSystemDocumentStore::new(documents.path())),
                audit,
                "standard",
            );

            Self {
                coordinator,
                pharmacy,
                prescriptions,
                backends,
                assignments,
                tiers,
                sink,
                prescriber_id,
                patient_id,
                _documents: documents,
            }
        }

        async fn with_backend(pharmacy: StubPharmacy) -> Self {
            let harness = Self::new(pharmacy).await;
            harness
                .backends
                .create(NewPharmacyBackend {
                    pharmacy_id: "PH-1".into(),
                    store_id: "store-1".into(),
                    api_key: ApiKey::new("sk_test_0123456789"),
                    base_url: None,
                    system_type: "standard".into(),
                    is_active: true,
                })
                .await
                .unwrap();
            harness
        }

        fn request(&self) -> SubmissionRequest {
            SubmissionRequest {
                prescriber_id: self.prescriber_id,
                patient_id: self.patient_id,
                encounter_id: None,
                appointment_id: None,
                medication: Some("Semaglutide".into()),
                medication_id: None,
                dosage: Some("0.25mg".into()),
                dosage_form: Some("injection".into()),
                quantity: 30,
                refills: 2,
                sig: "Inject 0.25mg weekly".into(),
                dispense_as_written: false,
                pharmacy_notes: None,
                pharmacy_id: Some("PH-1".into()),
                system_type: None,
                oversight_fees: Vec::new(),
                profit_cents: None,
                shipping_fee: None,
                shipping_fee_cents: None,
                has_custom_address: false,
                custom_address: None,
                patient: patient(),
                prescriber: prescriber(),
                document: None,
                submitted_by: None,
            }
        }

        fn actions(&self) -> Vec<String> {
            self.sink.actions()
        }
    }

    #[tokio::test]
    async fn accepted_submission_is_recorded_as_submitted() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let outcome = h.coordinator.submit(h.request()).await.unwrap();

        let stored = h.prescriptions.get(outcome.prescription_id).await.unwrap().unwrap();
        assert_eq!(stored.status, PrescriptionStatus::Submitted);
        assert_eq!(stored.queue_id, outcome.queue_id);
        assert_eq!(stored.quantity, 30);
        assert_eq!(stored.refills, 2);
        assert_eq!(stored.pharmacy_id.as_deref(), Some("PH-1"));
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.pricing, DiscountResolution::NotSet);
        assert_eq!(h.actions(), vec![actions::PRESCRIPTION_SUBMITTED.to_string()]);
        assert_eq!(h.sink.entries()[0].queue_id.as_deref(), Some(outcome.queue_id.as_str()));
        assert_eq!(h.sink.entries()[0].user_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn missing_backend_is_reported_and_nothing_is_sent() {
        let h = Harness::new(StubPharmacy::accepting()).await;
        let err = h.coordinator.submit(h.request()).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::BackendNotConfigured { .. }));
        assert_eq!(h.pharmacy.calls(), 0);
        assert!(h.prescriptions.is_empty());
    }

    #[tokio::test]
    async fn pharmacy_failure_leaves_no_record() {
        let h = Harness::with_backend(StubPharmacy::failing(PharmacyApiError::Rejected {
            status: 422,
            message: "Invalid NPI".into(),
        }))
        .await;

        let err = h.coordinator.submit(h.request()).await.unwrap_err();
        match err {
            FulfillmentError::PharmacySubmissionFailed(message) => assert_eq!(message, "Invalid NPI"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(h.prescriptions.is_empty());
        assert_eq!(h.actions(), vec![actions::PHARMACY_SUBMISSION_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn pharmacy_timeout_leaves_no_record() {
        let h = Harness::with_backend(StubPharmacy::failing(PharmacyApiError::Timeout(
            std::time::Duration::from_secs(30),
        )))
        .await;

        let err = h.coordinator.submit(h.request()).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::PharmacySubmissionFailed(_)));
        assert!(h.prescriptions.is_empty());
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_the_pharmacy_call() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;

        let mut negative = h.request();
        negative.refills = -1;
        let mut no_medication = h.request();
        no_medication.medication = Some("  ".into());
        let mut missing_address = h.request();
        missing_address.has_custom_address = true;
        let mut unknown_patient = h.request();
        unknown_patient.patient_id = Uuid::new_v4();
        let mut negative_fee = h.request();
        negative_fee.shipping_fee = Some("-5".parse().unwrap());

        for request in [negative, no_medication, missing_address, unknown_patient, negative_fee] {
            let err = h.coordinator.submit(request).await.unwrap_err();
            assert!(matches!(err, FulfillmentError::Validation(_)), "got {err:?}");
        }
        assert_eq!(h.pharmacy.calls(), 0);
        assert!(h.prescriptions.is_empty());
    }

    #[tokio::test]
    async fn catalog_medication_id_alone_is_enough() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let mut request = h.request();
        request.medication = None;
        request.medication_id = Some("MED-42".into());
        assert!(h.coordinator.submit(request).await.is_ok());
    }

    #[tokio::test]
    async fn fees_are_converted_to_cents_and_sent() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let mut request = h.request();
        request.oversight_fees = vec![
            OversightFee {
                label: "Dose titration monitoring".into(),
                amount: "49.995".parse().unwrap(),
            },
            OversightFee {
                label: "Check-in".into(),
                amount: "10".parse().unwrap(),
            },
        ];
        request.profit_cents = Some(99_999);
        request.shipping_fee = Some("15.5".parse().unwrap());

        let outcome = h.coordinator.submit(request).await.unwrap();
        assert_eq!(outcome.profit_cents, 5000 + 1000);
        assert_eq!(outcome.shipping_fee_cents, 1550);
        assert_eq!(h.pharmacy.orders.lock()[0].shipping.fee_cents, 1550);
    }

    #[tokio::test]
    async fn custom_address_is_sent_and_stored() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let address = ShippingAddress {
            line1: "500 Elm St".into(),
            line2: Some("Apt 4".into()),
            city: "Denver".into(),
            state: "CO".into(),
            postal_code: "80202".into(),
            country: None,
        };
        let mut request = h.request();
        request.has_custom_address = true;
        request.custom_address = Some(address.clone());

        let outcome = h.coordinator.submit(request).await.unwrap();
        let stored = h.prescriptions.get(outcome.prescription_id).await.unwrap().unwrap();
        assert_eq!(stored.custom_address, Some(address.clone()));
        assert_eq!(h.pharmacy.orders.lock()[0].shipping.address, Some(address));
    }

    #[tokio::test]
    async fn provider_discount_is_reported() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        h.tiers
            .create(NewTier::new("Gold", "gold", "15".parse().unwrap(), None).unwrap())
            .await
            .unwrap();
        h.assignments
            .set(&h.prescriber_id.to_string(), "gold")
            .await
            .unwrap();

        let outcome = h.coordinator.submit(h.request()).await.unwrap();
        assert_eq!(
            outcome.pricing.discount_percentage().map(|d| d.to_string()).as_deref(),
            Some("15.00")
        );
    }

    #[tokio::test]
    async fn attachment_failure_is_a_warning() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let mut request = h.request();
        request.document = Some(DocumentUpload {
            file_name: "rx.pdf".into(),
            content_type: None,
            content_base64: "%%% not base64".into(),
        });

        let outcome = h.coordinator.submit(request).await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.document_reference, None);
        assert!(h.prescriptions.get(outcome.prescription_id).await.unwrap().is_some());
        assert_eq!(
            h.actions(),
            vec![
                actions::PRESCRIPTION_SUBMITTED.to_string(),
                actions::DOCUMENT_ATTACHMENT_FAILED.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn attached_document_reference_is_returned() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let mut request = h.request();
        request.document = Some(DocumentUpload {
            file_name: "rx.pdf".into(),
            content_type: Some("application/pdf".into()),
            content_base64: STANDARD.encode(b"%PDF"),
        });

        let outcome = h.coordinator.submit(request).await.unwrap();
        assert_eq!(
            outcome.document_reference,
            Some(format!("{}/rx.pdf", outcome.prescription_id))
        );
    }

    #[tokio::test]
    async fn persistence_failure_after_acceptance_carries_queue_id() {
        let h = Harness::with_backend(StubPharmacy::with_fixed_queue_id("Q-DUP")).await;
        h.coordinator.submit(h.request()).await.unwrap();

        let err = h.coordinator.submit(h.request()).await.unwrap_err();
        match err {
            FulfillmentError::Persistence { queue_id, .. } => assert_eq!(queue_id, "Q-DUP"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(h.prescriptions.len(), 1);
        assert_eq!(
            h.actions().last().map(String::as_str),
            Some(actions::PRESCRIPTION_PERSIST_FAILED)
        );
    }

    #[tokio::test]
    async fn resubmission_creates_a_second_prescription() {
        let h = Harness::with_backend(StubPharmacy::accepting()).await;
        let first = h.coordinator.submit(h.request()).await.unwrap();
        let second = h.coordinator.submit(h.request()).await.unwrap();

        assert_ne!(first.prescription_id, second.prescription_id);
        assert_ne!(first.queue_id, second.queue_id);
        assert_eq!(h.prescriptions.len(), 2);
    }
}
