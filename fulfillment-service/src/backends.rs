use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{actions, AuditTrail};
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::models::{Actor, LogStatus, NewPharmacyBackend, PharmacyBackend, SystemLogEntry};
use crate::store::BackendStore;

/// Selects the pharmacy integration used for a submission.
///
/// The data layer allows several active rows for one pharmacy. The registry
/// picks the most recently updated one, breaking ties by id, and records the
/// ambiguity. Backends are returned as owned snapshots so a concurrent
/// rotation or deactivation never changes credentials under an in-flight call.
#[derive(Clone)]
pub struct PharmacyBackendRegistry {
    store: Arc<dyn BackendStore>,
    audit: AuditTrail,
}

impl PharmacyBackendRegistry {
    pub fn new(store: Arc<dyn BackendStore>, audit: AuditTrail) -> Self {
        Self { store, audit }
    }

    /// # Errors
    ///
    /// [`FulfillmentError::BackendNotConfigured`] when no active backend matches.
    pub async fn get_active_backend(
        &self,
        pharmacy_id: Option<&str>,
        system_type: &str,
    ) -> FulfillmentResult<PharmacyBackend> {
        let mut active: Vec<PharmacyBackend> = self
            .store
            .find(system_type, pharmacy_id)
            .await?
            .into_iter()
            .filter(|b| b.is_active)
            .collect();

        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

        if active.len() > 1 {
            let candidates: Vec<String> = active.iter().map(|b| b.id.to_string()).collect();
            warn!(
                system_type,
                pharmacy_id = ?pharmacy_id,
                candidates = ?candidates,
                "Multiple active pharmacy backends match, using the most recently updated"
            );
            self.audit
                .record(
                    SystemLogEntry::new(actions::BACKEND_AMBIGUOUS, LogStatus::Warning).with_details(
                        json!({
                            "system_type": system_type,
                            "pharmacy_id": pharmacy_id,
                            "candidates": candidates,
                        }),
                    ),
                )
                .await;
        }

        let backend = active.into_iter().next().ok_or_else(|| {
            FulfillmentError::BackendNotConfigured {
                system_type: system_type.to_string(),
                pharmacy_id: pharmacy_id.map(str::to_string),
            }
        })?;

        debug!(
            backend_id = %backend.id,
            pharmacy_id = %backend.pharmacy_id,
            api_key = %backend.api_key.masked(),
            "Pharmacy backend selected"
        );
        Ok(backend)
    }

    pub async fn list(&self) -> FulfillmentResult<Vec<PharmacyBackend>> {
        Ok(self.store.list().await?)
    }

    pub async fn register(
        &self,
        backend: NewPharmacyBackend,
        actor: &Actor,
    ) -> FulfillmentResult<PharmacyBackend> {
        backend.validate()?;
        let backend = self.store.create(backend).await?;

        info!(
            backend_id = %backend.id,
            pharmacy_id = %backend.pharmacy_id,
            api_key = %backend.api_key.masked(),
            is_active = backend.is_active,
            "Pharmacy backend registered"
        );
        self.audit
            .record(
                SystemLogEntry::new(actions::BACKEND_CREATED, LogStatus::Success)
                    .with_actor(actor)
                    .with_details(json!({
                        "backend_id": backend.id,
                        "pharmacy_id": backend.pharmacy_id,
                        "system_type": backend.system_type,
                        "is_active": backend.is_active,
                    })),
            )
            .await;
        Ok(backend)
    }

    pub async fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
        actor: &Actor,
    ) -> FulfillmentResult<PharmacyBackend> {
        let backend = self.store.set_active(id, is_active).await?;
        info!(backend_id = %id, is_active, "Pharmacy backend activation changed");
        self.audit
            .record(
                SystemLogEntry::new(actions::BACKEND_ACTIVATION_CHANGED, LogStatus::Info)
                    .with_actor(actor)
                    .with_details(json!({ "backend_id": id, "is_active": is_active })),
            )
            .await;
        Ok(backend)
    }
}

impl std::fmt::Debug for PharmacyBackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PharmacyBackendRegistry").finish_non_exhaustive()
    }
}
