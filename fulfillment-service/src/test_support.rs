//! Fixtures shared by unit tests across modules

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{
    PatientDetails, PharmacyBackend, PrescriberDetails, Prescription, PrescriptionStatus,
};
use crate::pharmacy_api::{PharmacyApiError, PharmacyClient, PharmacyOrder, PharmacyReceipt};

pub(crate) fn prescription(queue_id: &str) -> Prescription {
    let now = Utc::now();
    Prescription {
        id: Uuid::new_v4(),
        queue_id: queue_id.to_string(),
        status: PrescriptionStatus::Submitted,
        prescriber_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        encounter_id: None,
        appointment_id: None,
        medication: Some("Semaglutide".to_string()),
        medication_id: None,
        dosage: Some("0.25mg".to_string()),
        dosage_form: None,
        quantity: 30,
        refills: 2,
        sig: "Inject 0.25mg weekly".to_string(),
        dispense_as_written: false,
        pharmacy_notes: None,
        pharmacy_id: Some("PH-1".to_string()),
        backend_id: Uuid::new_v4(),
        profit_cents: 0,
        shipping_fee_cents: 0,
        tracking_number: None,
        custom_address: None,
        submitted_at: now,
        updated_at: now,
    }
}

pub(crate) fn patient() -> PatientDetails {
    PatientDetails {
        first_name: "Pat".into(),
        last_name: "Doe".into(),
        date_of_birth: Some("1990-01-01".into()),
        phone: Some("(555) 123-4567".into()),
        email: Some("pat@example.com".into()),
    }
}

pub(crate) fn prescriber() -> PrescriberDetails {
    PrescriberDetails {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        npi: "1234567890".into(),
        dea: Some("AL1234563".into()),
    }
}

/// Pharmacy double: accepts with sequential queue ids, or fails as told
#[derive(Default)]
pub(crate) struct StubPharmacy {
    failure: Option<PharmacyApiError>,
    fixed_queue_id: Option<String>,
    counter: AtomicUsize,
    pub(crate) orders: Mutex<Vec<PharmacyOrder>>,
}

impl StubPharmacy {
    pub(crate) fn accepting() -> Self {
        Self::default()
    }

    pub(crate) fn failing(error: PharmacyApiError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub(crate) fn with_fixed_queue_id(queue_id: &str) -> Self {
        Self {
            fixed_queue_id: Some(queue_id.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.orders.lock().len()
    }
}

#[async_trait]
impl PharmacyClient for StubPharmacy {
    async fn submit(
        &self,
        _backend: &PharmacyBackend,
        order: &PharmacyOrder,
    ) -> Result<PharmacyReceipt, PharmacyApiError> {
        self.orders.lock().push(order.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PharmacyReceipt {
            queue_id: self
                .fixed_queue_id
                .clone()
                .unwrap_or_else(|| format!("Q-{n}")),
        })
    }
}
