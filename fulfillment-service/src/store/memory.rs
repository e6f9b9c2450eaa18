use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    AssignmentStore, BackendStore, ParticipantDirectory, PrescriptionStore, StatusChange,
    SystemLogSink, TierStore,
};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    NewPharmacyBackend, NewTier, PharmacyBackend, Prescription, PrescriptionFilter,
    PrescriptionStatus, ProviderTierAssignment, SystemLogEntry, Tier, TierChanges,
};

/// Tiers held in process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTierStore {
    tiers: RwLock<HashMap<Uuid, Tier>>,
}

impl InMemoryTierStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_unique(tiers: &HashMap<Uuid, Tier>, skip: Option<Uuid>, name: &str, code: &str) -> StoreResult<()> {
    for tier in tiers.values().filter(|t| Some(t.id) != skip) {
        if tier.name == name {
            return Err(StoreError::Duplicate(format!("tier name '{name}'")));
        }
        if tier.code == code {
            return Err(StoreError::Duplicate(format!("tier code '{code}'")));
        }
    }
    Ok(())
}

#[async_trait]
impl TierStore for InMemoryTierStore {
    async fn list(&self) -> StoreResult<Vec<Tier>> {
        let mut tiers: Vec<Tier> = self.tiers.read().values().cloned().collect();
        tiers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tiers)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Tier>> {
        Ok(self.tiers.read().get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Tier>> {
        Ok(self.tiers.read().values().find(|t| t.code == code).cloned())
    }

    async fn create(&self, tier: NewTier) -> StoreResult<Tier> {
        let mut tiers = self.tiers.write();
        ensure_unique(&tiers, None, &tier.name, &tier.code)?;
        let tier = Tier::from_new(tier);
        tiers.insert(tier.id, tier.clone());
        Ok(tier)
    }

    async fn update(&self, id: Uuid, changes: &TierChanges) -> StoreResult<Tier> {
        let mut tiers = self.tiers.write();
        let mut updated = tiers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tier {id}")))?;
        changes.apply(&mut updated);
        ensure_unique(&tiers, Some(id), &updated.name, &updated.code)?;
        tiers.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.tiers
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tier {id}")))
    }
}

/// Provider assignments held in process memory
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    assignments: RwLock<BTreeMap<String, String>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn get(&self, provider_id: &str) -> StoreResult<Option<String>> {
        Ok(self.assignments.read().get(provider_id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<ProviderTierAssignment>> {
        Ok(self
            .assignments
            .read()
            .iter()
            .map(|(provider_id, tier_code)| ProviderTierAssignment {
                provider_id: provider_id.clone(),
                tier_code: tier_code.clone(),
            })
            .collect())
    }

    async fn set(&self, provider_id: &str, tier_code: &str) -> StoreResult<ProviderTierAssignment> {
        self.assignments
            .write()
            .insert(provider_id.to_string(), tier_code.to_string());
        Ok(ProviderTierAssignment {
            provider_id: provider_id.to_string(),
            tier_code: tier_code.to_string(),
        })
    }

    async fn remove(&self, provider_id: &str) -> StoreResult<()> {
        self.assignments
            .write()
            .remove(provider_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tier assignment for provider {provider_id}")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPrescriptionStore {
    prescriptions: RwLock<HashMap<Uuid, Prescription>>,
}

impl InMemoryPrescriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.prescriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prescriptions.read().is_empty()
    }
}

#[async_trait]
impl PrescriptionStore for InMemoryPrescriptionStore {
    async fn insert(&self, prescription: &Prescription) -> StoreResult<()> {
        let mut prescriptions = self.prescriptions.write();
        if prescriptions
            .values()
            .any(|p| p.queue_id == prescription.queue_id)
        {
            return Err(StoreError::Duplicate(format!(
                "prescription queue id '{}'",
                prescription.queue_id
            )));
        }
        prescriptions.insert(prescription.id, prescription.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Prescription>> {
        Ok(self.prescriptions.read().get(&id).cloned())
    }

    async fn find_by_queue_id(&self, queue_id: &str) -> StoreResult<Option<Prescription>> {
        Ok(self
            .prescriptions
            .read()
            .values()
            .find(|p| p.queue_id == queue_id)
            .cloned())
    }

    async fn list(&self, filter: &PrescriptionFilter) -> StoreResult<Vec<Prescription>> {
        let mut found: Vec<Prescription> = self
            .prescriptions
            .read()
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(found)
    }

    async fn apply_status(
        &self,
        queue_id: &str,
        status: PrescriptionStatus,
        tracking_number: Option<&str>,
        forward_only: bool,
    ) -> StoreResult<StatusChange> {
        let mut prescriptions = self.prescriptions.write();
        let Some(prescription) = prescriptions.values_mut().find(|p| p.queue_id == queue_id) else {
            return Ok(StatusChange::NotFound);
        };
        if forward_only && status < prescription.status {
            return Ok(StatusChange::Rejected {
                current: prescription.status,
            });
        }
        prescription.status = status;
        if let Some(tracking) = tracking_number {
            prescription.tracking_number = Some(tracking.to_string());
        }
        prescription.updated_at = Utc::now();
        Ok(StatusChange::Applied(Box::new(prescription.clone())))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackendStore {
    backends: RwLock<Vec<PharmacyBackend>>,
}

impl InMemoryBackendStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed backend, keeping its timestamps
    pub fn seed(&self, backend: PharmacyBackend) {
        self.backends.write().push(backend);
    }
}

#[async_trait]
impl BackendStore for InMemoryBackendStore {
    async fn list(&self) -> StoreResult<Vec<PharmacyBackend>> {
        Ok(self.backends.read().clone())
    }

    async fn find(
        &self,
        system_type: &str,
        pharmacy_id: Option<&str>,
    ) -> StoreResult<Vec<PharmacyBackend>> {
        Ok(self
            .backends
            .read()
            .iter()
            .filter(|b| b.system_type == system_type)
            .filter(|b| pharmacy_id.map_or(true, |p| b.pharmacy_id == p))
            .cloned()
            .collect())
    }

    async fn create(&self, backend: NewPharmacyBackend) -> StoreResult<PharmacyBackend> {
        let backend = backend.into_backend();
        self.backends.write().push(backend.clone());
        Ok(backend)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<PharmacyBackend> {
        let mut backends = self.backends.write();
        let backend = backends
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("pharmacy backend {id}")))?;
        backend.is_active = is_active;
        backend.updated_at = Utc::now();
        Ok(backend.clone())
    }
}

/// Participant directory backed by explicit id sets
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    prescribers: RwLock<HashSet<Uuid>>,
    patients: RwLock<HashSet<Uuid>>,
    accept_all: bool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory that knows every id. Used by memory storage, where the
    /// provider and patient records live outside this service.
    pub fn accepting_all() -> Self {
        Self {
            accept_all: true,
            ..Self::default()
        }
    }

    pub fn add_prescriber(&self, id: Uuid) {
        self.prescribers.write().insert(id);
    }

    pub fn add_patient(&self, id: Uuid) {
        self.patients.write().insert(id);
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryDirectory {
    async fn prescriber_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.accept_all || self.prescribers.read().contains(&id))
    }

    async fn patient_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.accept_all || self.patients.read().contains(&id))
    }
}

/// Process-local system log. A bounded sink drops its oldest entries first.
#[derive(Debug, Default)]
pub struct InMemorySystemLogSink {
    entries: RwLock<VecDeque<SystemLogEntry>>,
    capacity: Option<usize>,
}

impl InMemorySystemLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: RwLock::default(),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn entries(&self) -> Vec<SystemLogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.action.clone()).collect()
    }
}

#[async_trait]
impl SystemLogSink for InMemorySystemLogSink {
    async fn append(&self, entry: &SystemLogEntry) -> StoreResult<()> {
        let mut entries = self.entries.write();
        if self.capacity.is_some_and(|cap| entries.len() >= cap) {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        Ok(())
    }
}
