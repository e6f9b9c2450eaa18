use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::{actions, AuditTrail};
use crate::error::{FulfillmentError, FulfillmentResult, StoreError};
use crate::models::{
    normalize_provider_id, normalize_tier_code, Actor, LogStatus, NewTier, ProviderTierAssignment,
    SystemLogEntry, Tier,
    TierChanges,
};
use crate::store::{AssignmentStore, TierStore};

/// Admin operations on tiers and provider tier assignments
#[derive(Clone)]
pub struct TierCatalog {
    tiers: Arc<dyn TierStore>,
    assignments: Arc<dyn AssignmentStore>,
    audit: AuditTrail,
}

impl TierCatalog {
    pub fn new(
        tiers: Arc<dyn TierStore>,
        assignments: Arc<dyn AssignmentStore>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            tiers,
            assignments,
            audit,
        }
    }

    pub async fn list_tiers(&self) -> FulfillmentResult<Vec<Tier>> {
        Ok(self.tiers.list().await?)
    }

    pub async fn get_tier(&self, id: Uuid) -> FulfillmentResult<Tier> {
        self.tiers
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tier {id}")).into())
    }

    pub async fn get_tier_by_code(&self, code: &str) -> FulfillmentResult<Tier> {
        let code = normalize_tier_code(code);
        self.tiers
            .get_by_code(&code)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tier code '{code}'")).into())
    }

    pub async fn create_tier(&self, tier: NewTier, actor: &Actor) -> FulfillmentResult<Tier> {
        let tier = self.tiers.create(tier).await?;
        info!(tier_id = %tier.id, tier_code = %tier.code, "Tier created");
        self.record(actions::TIER_CREATED, actor, json!({
            "tier_id": tier.id,
            "tier_code": tier.code,
            "discount_percentage": tier.discount_percentage,
        }))
        .await;
        Ok(tier)
    }

    pub async fn update_tier(
        &self,
        id: Uuid,
        changes: TierChanges,
        actor: &Actor,
    ) -> FulfillmentResult<Tier> {
        if changes.is_empty() {
            return Err(FulfillmentError::Validation("no tier fields to update".into()));
        }
        let tier = self.tiers.update(id, &changes).await?;
        info!(tier_id = %tier.id, tier_code = %tier.code, "Tier updated");
        self.record(actions::TIER_UPDATED, actor, json!({
            "tier_id": tier.id,
            "tier_code": tier.code,
            "discount_percentage": tier.discount_percentage,
        }))
        .await;
        Ok(tier)
    }

    /// Hard delete. Assignments that point at the tier are left dangling.
    pub async fn delete_tier(&self, id: Uuid, actor: &Actor) -> FulfillmentResult<()> {
        self.tiers.delete(id).await?;
        info!(tier_id = %id, "Tier deleted");
        self.record(actions::TIER_DELETED, actor, json!({ "tier_id": id }))
            .await;
        Ok(())
    }

    pub async fn list_assignments(&self) -> FulfillmentResult<Vec<ProviderTierAssignment>> {
        Ok(self.assignments.list().await?)
    }

    /// Last write wins. The code is stored even if no tier carries it.
    pub async fn assign(
        &self,
        provider_id: &str,
        tier_code: &str,
        actor: &Actor,
    ) -> FulfillmentResult<ProviderTierAssignment> {
        let provider_id = normalize_provider_id(provider_id);
        if provider_id.is_empty() {
            return Err(FulfillmentError::Validation("provider id is required".into()));
        }
        let tier_code = normalize_tier_code(tier_code);
        if tier_code.is_empty() {
            return Err(FulfillmentError::Validation("tier code is required".into()));
        }

        let assignment = self.assignments.set(&provider_id, &tier_code).await?;
        info!(provider_id = %provider_id, tier_code = %tier_code, "Provider tier assigned");
        self.record(actions::PROVIDER_TIER_ASSIGNED, actor, json!({
            "provider_id": provider_id,
            "tier_code": tier_code,
        }))
        .await;
        Ok(assignment)
    }

    pub async fn unassign(&self, provider_id: &str, actor: &Actor) -> FulfillmentResult<()> {
        let provider_id = normalize_provider_id(provider_id);
        self.assignments.remove(&provider_id).await?;
        info!(provider_id = %provider_id, "Provider tier assignment removed");
        self.record(actions::PROVIDER_TIER_REMOVED, actor, json!({ "provider_id": provider_id }))
            .await;
        Ok(())
    }

    async fn record(&self, action: &str, actor: &Actor, details: serde_json::Value) {
        self.audit
            .record(
                SystemLogEntry::new(action, LogStatus::Success)
                    .with_actor(actor)
                    .with_details(details),
            )
            .await;
    }
}

impl std::fmt::Debug for TierCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierCatalog").finish_non_exhaustive()
    }
}
