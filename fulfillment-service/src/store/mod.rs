//! Persistence seams
//!
//! Each store is a trait with a PostgreSQL implementation ([`postgres`]) and an
//! in-process one ([`memory`]). Provider tier assignments additionally have a
//! file-backed implementation ([`file`]) used as the degraded-mode fallback.
//! [`resilient`] combines a primary and a fallback behind the same trait.

pub mod file;
pub mod memory;
pub mod postgres;
pub mod resilient;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    NewPharmacyBackend, NewTier, PharmacyBackend, Prescription, PrescriptionFilter,
    PrescriptionStatus, ProviderTierAssignment, SystemLogEntry, Tier, TierChanges,
};

pub use file::FileAssignmentStore;
pub use memory::{
    InMemoryAssignmentStore, InMemoryBackendStore, InMemoryDirectory, InMemoryPrescriptionStore,
    InMemorySystemLogSink, InMemoryTierStore,
};
pub use postgres::{
    PgAssignmentStore, PgBackendStore, PgDirectory, PgPrescriptionStore, PgSystemLogSink,
    PgTierStore,
};
pub use resilient::{FallbackLogSink, Resilient};

/// Authoritative source of discount tiers
#[async_trait]
pub trait TierStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Tier>>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Tier>>;

    /// `code` must already be normalized
    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Tier>>;

    /// Fails with `Duplicate` when the name or code is taken
    async fn create(&self, tier: NewTier) -> StoreResult<Tier>;

    /// Fails with `NotFound` for an unknown id, `Duplicate` when the new name or
    /// code belongs to another tier
    async fn update(&self, id: Uuid, changes: &TierChanges) -> StoreResult<Tier>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Provider → tier code, last write wins
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn get(&self, provider_id: &str) -> StoreResult<Option<String>>;

    async fn list(&self) -> StoreResult<Vec<ProviderTierAssignment>>;

    async fn set(&self, provider_id: &str, tier_code: &str) -> StoreResult<ProviderTierAssignment>;

    /// Fails with `NotFound` when the provider has no assignment
    async fn remove(&self, provider_id: &str) -> StoreResult<()>;
}

/// Result of a status write from the pharmacy webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Applied(Box<Prescription>),
    NotFound,
    /// Refused by the forward-only guard; the record is untouched
    Rejected { current: PrescriptionStatus },
}

#[async_trait]
pub trait PrescriptionStore: Send + Sync {
    /// Fails with `Duplicate` when the queue id is already recorded
    async fn insert(&self, prescription: &Prescription) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Prescription>>;

    async fn find_by_queue_id(&self, queue_id: &str) -> StoreResult<Option<Prescription>>;

    /// Newest first
    async fn list(&self, filter: &PrescriptionFilter) -> StoreResult<Vec<Prescription>>;

    /// Set `status`, and `tracking_number` when one is given, on the record with
    /// `queue_id`. With `forward_only` the write is refused when it would move
    /// the lifecycle backwards. The check and the write happen in one step.
    async fn apply_status(
        &self,
        queue_id: &str,
        status: PrescriptionStatus,
        tracking_number: Option<&str>,
        forward_only: bool,
    ) -> StoreResult<StatusChange>;
}

#[async_trait]
pub trait BackendStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<PharmacyBackend>>;

    /// Every backend of `system_type`, restricted to `pharmacy_id` when given,
    /// active or not
    async fn find(
        &self,
        system_type: &str,
        pharmacy_id: Option<&str>,
    ) -> StoreResult<Vec<PharmacyBackend>>;

    async fn create(&self, backend: NewPharmacyBackend) -> StoreResult<PharmacyBackend>;

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<PharmacyBackend>;
}

/// Lookup of prescriber and patient records owned by the wider application
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn prescriber_exists(&self, id: Uuid) -> StoreResult<bool>;

    async fn patient_exists(&self, id: Uuid) -> StoreResult<bool>;
}

/// Append-only audit trail
#[async_trait]
pub trait SystemLogSink: Send + Sync {
    async fn append(&self, entry: &SystemLogEntry) -> StoreResult<()>;
}
