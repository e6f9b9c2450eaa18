use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::AssignmentStore;
use crate::error::{StoreError, StoreResult};
use crate::models::ProviderTierAssignment;

/// Provider assignments persisted as one flat JSON object on local disk,
/// `{"<provider_id>": "<tier_code>", ...}`.
///
/// Every call loads the whole map, and every mutation rewrites it in full.
/// Writers in this process are serialised by a mutex and the file is replaced
/// atomically through a sibling temp file; separate processes sharing the same
/// path can still lose each other's updates.
#[derive(Debug)]
pub struct FileAssignmentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAssignmentStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::Unavailable(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, assignments: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(assignments)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = assignments.len(), "Provider tier file rewritten");
        Ok(())
    }
}

#[async_trait]
impl AssignmentStore for FileAssignmentStore {
    async fn get(&self, provider_id: &str) -> StoreResult<Option<String>> {
        Ok(self.load().await?.remove(provider_id))
    }

    async fn list(&self) -> StoreResult<Vec<ProviderTierAssignment>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|(provider_id, tier_code)| ProviderTierAssignment {
                provider_id,
                tier_code,
            })
            .collect())
    }

    async fn set(&self, provider_id: &str, tier_code: &str) -> StoreResult<ProviderTierAssignment> {
        let _guard = self.write_lock.lock().await;
        let mut assignments = self.load().await?;
        assignments.insert(provider_id.to_string(), tier_code.to_string());
        self.save(&assignments).await?;
        Ok(ProviderTierAssignment {
            provider_id: provider_id.to_string(),
            tier_code: tier_code.to_string(),
        })
    }

    async fn remove(&self, provider_id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut assignments = self.load().await?;
        if assignments.remove(provider_id).is_none() {
            return Err(StoreError::NotFound(format!(
                "tier assignment for provider {provider_id}"
            )));
        }
        self.save(&assignments).await
    }
}
