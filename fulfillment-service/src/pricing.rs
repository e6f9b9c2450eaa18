use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FulfillmentResult;
use crate::models::normalize_provider_id;
use crate::store::{AssignmentStore, TierStore};

/// Discount in effect for a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscountResolution {
    Set {
        tier_name: String,
        tier_code: String,
        discount_percentage: Decimal,
    },
    NotSet,
}

impl DiscountResolution {
    pub fn discount_percentage(&self) -> Option<Decimal> {
        match self {
            Self::Set {
                discount_percentage,
                ..
            } => Some(*discount_percentage),
            Self::NotSet => None,
        }
    }
}

/// Provider-facing view of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderTierView {
    /// `"<name> (<pct>%)"`, or `"Not set"`
    pub tier_level: String,
    /// The stored code, even when it no longer names a tier
    pub tier_code: Option<String>,
}

pub const TIER_NOT_SET: &str = "Not set";

/// Resolves a provider's discount from the assignment and tier stores, fresh
/// on every call
#[derive(Clone)]
pub struct PricingResolver {
    assignments: Arc<dyn AssignmentStore>,
    tiers: Arc<dyn TierStore>,
}

impl PricingResolver {
    pub fn new(assignments: Arc<dyn AssignmentStore>, tiers: Arc<dyn TierStore>) -> Self {
        Self { assignments, tiers }
    }

    /// Never fails: a missing assignment, a dangling tier code and a store
    /// failure all resolve to [`DiscountResolution::NotSet`].
    pub async fn resolve_discount(&self, provider_id: &str) -> DiscountResolution {
        match self.try_resolve(provider_id).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(provider_id, error = %e, "Discount lookup failed, treating as not set");
                DiscountResolution::NotSet
            }
        }
    }

    async fn try_resolve(&self, provider_id: &str) -> FulfillmentResult<DiscountResolution> {
        let Some(tier_code) = self.assignments.get(&normalize_provider_id(provider_id)).await? else {
            return Ok(DiscountResolution::NotSet);
        };

        match self.tiers.get_by_code(&tier_code).await? {
            Some(tier) => Ok(DiscountResolution::Set {
                tier_name: tier.name,
                tier_code: tier.code,
                discount_percentage: tier.discount_percentage,
            }),
            None => {
                debug!(provider_id, tier_code = %tier_code, "Assignment points at a missing tier");
                Ok(DiscountResolution::NotSet)
            }
        }
    }

    /// # Errors
    ///
    /// Propagates store failures that the resilient stores could not absorb.
    pub async fn provider_tier(&self, provider_id: &str) -> FulfillmentResult<ProviderTierView> {
        let Some(tier_code) = self.assignments.get(&normalize_provider_id(provider_id)).await? else {
            return Ok(ProviderTierView {
                tier_level: TIER_NOT_SET.to_string(),
                tier_code: None,
            });
        };

        let tier_level = self
            .tiers
            .get_by_code(&tier_code)
            .await?
            .map_or_else(|| TIER_NOT_SET.to_string(), |tier| tier.label());

        Ok(ProviderTierView {
            tier_level,
            tier_code: Some(tier_code),
        })
    }
}

impl std::fmt::Debug for PricingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::models::{NewTier, ProviderTierAssignment};
    use crate::store::{InMemoryAssignmentStore, InMemoryTierStore};
    use async_trait::async_trait;

    struct Broken;

    #[async_trait]
    impl AssignmentStore for Broken {
        async fn get(&self, _provider_id: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("disk full".into()))
        }
        async fn list(&self) -> StoreResult<Vec<ProviderTierAssignment>> {
            Err(StoreError::Unavailable("disk full".into()))
        }
        async fn set(&self, _p: &str, _t: &str) -> StoreResult<ProviderTierAssignment> {
            Err(StoreError::Unavailable("disk full".into()))
        }
        async fn remove(&self, _p: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("disk full".into()))
        }
    }

    async fn fixture() -> (PricingResolver, Arc<InMemoryAssignmentStore>, Arc<InMemoryTierStore>) {
        let assignments = Arc::new(InMemoryAssignmentStore::new());
        let tiers = Arc::new(InMemoryTierStore::new());
        tiers
            .create(NewTier::new("Gold", "gold", "15".parse().unwrap(), None).unwrap())
            .await
            .unwrap();
        (
            PricingResolver::new(assignments.clone(), tiers.clone()),
            assignments,
            tiers,
        )
    }

    #[tokio::test]
    async fn provider_id_lookup_ignores_uuid_spelling() {
        let (pricing, assignments, _) = fixture().await;
        assignments
            .set("6f1c1f5e-8a44-4c2e-9c4e-0d3c3f4b1a01", "gold")
            .await
            .unwrap();

        let resolution = pricing
            .resolve_discount("6F1C1F5E-8A44-4C2E-9C4E-0D3C3F4B1A01")
            .await;
        assert!(matches!(resolution, DiscountResolution::Set { .. }));
        let view = pricing
            .provider_tier("{6f1c1f5e-8a44-4c2e-9c4e-0d3c3f4b1a01}")
            .await
            .unwrap();
        assert_eq!(view.tier_level, "Gold (15.00%)");
    }

    #[tokio::test]
    async fn assigned_tier_resolves() {
        let (pricing, assignments, _) = fixture().await;
        assignments.set("prov-1", "gold").await.unwrap();

        let resolution = pricing.resolve_discount("prov-1").await;
        assert_eq!(
            resolution.discount_percentage().map(|d| d.to_string()).as_deref(),
            Some("15.00")
        );
        assert!(matches!(resolution, DiscountResolution::Set { ref tier_name, .. } if tier_name == "Gold"));
    }

    #[tokio::test]
    async fn missing_assignment_is_not_set() {
        let (pricing, _, _) = fixture().await;
        assert_eq!(pricing.resolve_discount("prov-9").await, DiscountResolution::NotSet);
        let view = pricing.provider_tier("prov-9").await.unwrap();
        assert_eq!(view.tier_level, "Not set");
        assert_eq!(view.tier_code, None);
    }

    #[tokio::test]
    async fn dangling_assignment_is_not_set_but_keeps_code() {
        let (pricing, assignments, tiers) = fixture().await;
        assignments.set("prov-1", "platinum").await.unwrap();
        assert_eq!(pricing.resolve_discount("prov-1").await, DiscountResolution::NotSet);

        let view = pricing.provider_tier("prov-1").await.unwrap();
        assert_eq!(view.tier_level, "Not set");
        assert_eq!(view.tier_code.as_deref(), Some("platinum"));

        // deleting the tier after assignment behaves the same
        assignments.set("prov-2", "gold").await.unwrap();
        let gold = tiers.get_by_code("gold").await.unwrap().unwrap();
        tiers.delete(gold.id).await.unwrap();
        assert_eq!(pricing.resolve_discount("prov-2").await, DiscountResolution::NotSet);
    }

    #[tokio::test]
    async fn tier_level_uses_two_decimal_percentage() {
        let (pricing, assignments, _) = fixture().await;
        assignments.set("prov-1", "gold").await.unwrap();
        let view = pricing.provider_tier("prov-1").await.unwrap();
        assert_eq!(view.tier_level, "Gold (15.00%)");
        assert_eq!(view.tier_code.as_deref(), Some("gold"));
    }

    #[tokio::test]
    async fn store_failure_does_not_escape_resolve() {
        let pricing = PricingResolver::new(Arc::new(Broken), Arc::new(InMemoryTierStore::new()));
        assert_eq!(pricing.resolve_discount("prov-1").await, DiscountResolution::NotSet);
        assert!(pricing.provider_tier("prov-1").await.is_err());
    }

    #[test]
    fn not_set_serializes_with_status_tag() {
        assert_eq!(
            serde_json::to_value(DiscountResolution::NotSet).unwrap(),
            serde_json::json!({ "status": "not_set" })
        );
    }
}
