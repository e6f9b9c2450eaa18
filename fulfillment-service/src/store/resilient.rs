use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AssignmentStore, SystemLogSink, TierStore};
use crate::audit::{actions, AuditTrail};
use crate::error::{StoreError, StoreResult};
use crate::models::{LogStatus, NewTier, ProviderTierAssignment, SystemLogEntry, Tier, TierChanges};

/// Primary store with a degraded-mode fallback.
///
/// Each call goes to the primary first. Only [`StoreError::Unavailable`] sends
/// it to the fallback; duplicate and not-found answers from the primary are
/// returned as they are. The two stores are never reconciled, so data written
/// while degraded stays in the fallback.
pub struct Resilient<S: ?Sized> {
    name: &'static str,
    primary: Arc<S>,
    fallback: Arc<S>,
    audit: AuditTrail,
}

impl<S: ?Sized + Send + Sync> Resilient<S> {
    pub fn new(name: &'static str, primary: Arc<S>, fallback: Arc<S>, audit: AuditTrail) -> Self {
        Self {
            name,
            primary,
            fallback,
            audit,
        }
    }

    async fn call<'a, T, F>(&'a self, operation: &'static str, op: F) -> StoreResult<T>
    where
        F: Fn(&'a S) -> BoxFuture<'a, StoreResult<T>> + Send + Sync,
        T: Send,
    {
        match op(&*self.primary).await {
            Err(StoreError::Unavailable(reason)) => {
                warn!(
                    store = self.name,
                    operation,
                    reason = %reason,
                    "Primary store unavailable, serving from fallback"
                );
                self.audit
                    .record(
                        SystemLogEntry::new(actions::STORE_DEGRADED, LogStatus::Warning).with_details(
                            json!({ "store": self.name, "operation": operation, "reason": reason }),
                        ),
                    )
                    .await;
                op(&*self.fallback).await
            }
            answered => {
                debug!(store = self.name, operation, "Served by primary store");
                answered
            }
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for Resilient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resilient")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TierStore for Resilient<dyn TierStore> {
    async fn list(&self) -> StoreResult<Vec<Tier>> {
        self.call("list", |s| s.list()).await
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Tier>> {
        self.call("get", move |s| s.get(id)).await
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Tier>> {
        self.call("get_by_code", |s| s.get_by_code(code)).await
    }

    async fn create(&self, tier: NewTier) -> StoreResult<Tier> {
        self.call("create", |s| s.create(tier.clone())).await
    }

    async fn update(&self, id: Uuid, changes: &TierChanges) -> StoreResult<Tier> {
        self.call("update", move |s| s.update(id, changes)).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.call("delete", move |s| s.delete(id)).await
    }
}

#[async_trait]
impl AssignmentStore for Resilient<dyn AssignmentStore> {
    async fn get(&self, provider_id: &str) -> StoreResult<Option<String>> {
        self.call("get", |s| s.get(provider_id)).await
    }

    async fn list(&self) -> StoreResult<Vec<ProviderTierAssignment>> {
        self.call("list", |s| s.list()).await
    }

    async fn set(&self, provider_id: &str, tier_code: &str) -> StoreResult<ProviderTierAssignment> {
        self.call("set", |s| s.set(provider_id, tier_code)).await
    }

    async fn remove(&self, provider_id: &str) -> StoreResult<()> {
        self.call("remove", |s| s.remove(provider_id)).await
    }
}

/// System log sink that writes to `fallback` while `primary` is unreachable.
///
/// Fallback writes are only traced: auditing them would write back into the
/// sink being audited.
pub struct FallbackLogSink {
    primary: Arc<dyn SystemLogSink>,
    fallback: Arc<dyn SystemLogSink>,
}

impl FallbackLogSink {
    pub fn new(primary: Arc<dyn SystemLogSink>, fallback: Arc<dyn SystemLogSink>) -> Self {
        Self { primary, fallback }
    }
}

impl std::fmt::Debug for FallbackLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackLogSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl SystemLogSink for FallbackLogSink {
    async fn append(&self, entry: &SystemLogEntry) -> StoreResult<()> {
        match self.primary.append(entry).await {
            Err(StoreError::Unavailable(reason)) => {
                debug!(action = %entry.action, reason = %reason, "System log kept in fallback sink");
                self.fallback.append(entry).await
            }
            written => written,
        }
    }
}
