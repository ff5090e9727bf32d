use super::blob::BlobStore;
use crate::model::{same_name, TrackedTarget};
use anyhow::Context;
use std::sync::Arc;

pub const DEFAULT_TARGETS_PATH: &str = "tracking_config.json";

/// The list of brands the daily audit tracks.
#[derive(Clone)]
pub struct TargetList {
    blobs: Arc<dyn BlobStore>,
    path: String,
}

impl TargetList {
    pub fn new(blobs: Arc<dyn BlobStore>, path: impl Into<String>) -> Self {
        Self {
            blobs,
            path: path.into(),
        }
    }

    /// Tracked targets, or an empty list if none are stored or the store is down.
    pub async fn load(&self) -> Vec<TrackedTarget> {
        match self.try_load().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    event = "geolens.targets.load_failed",
                    path = %self.path,
                    error = %format!("{e:#}"),
                    "tracked targets unavailable; using an empty list"
                );
                Vec::new()
            }
        }
    }

    pub async fn try_load(&self) -> anyhow::Result<Vec<TrackedTarget>> {
        match self.blobs.read(&self.path).await? {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to parse {}", self.path))
            }
            _ => Ok(Vec::new()),
        }
    }

    pub async fn save(&self, targets: &[TrackedTarget]) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(targets)?;
        self.blobs.write(&self.path, &data, "Update Config").await
    }

    /// Returns false when an identical (case-insensitive) target already exists.
    pub async fn add(&self, target: TrackedTarget) -> anyhow::Result<bool> {
        let mut targets = self.try_load().await?;
        if targets.iter().any(|t| t.same_as(&target)) {
            return Ok(false);
        }
        targets.push(target);
        self.save(&targets).await?;
        Ok(true)
    }

    /// Remove by brand, optionally narrowed by category and use case.
    /// Returns how many entries were removed.
    pub async fn remove(
        &self,
        brand: &str,
        category: Option<&str>,
        use_case: Option<&str>,
    ) -> anyhow::Result<usize> {
        let mut targets = self.try_load().await?;
        let before = targets.len();
        targets.retain(|t| {
            let hit = same_name(&t.brand, brand)
                && category.is_none_or(|c| same_name(&t.category, c))
                && use_case.is_none_or(|u| same_name(&t.use_case, u));
            !hit
        });
        let removed = before - targets.len();
        if removed > 0 {
            self.save(&targets).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::blob::MemoryBlobStore;

    fn list() -> TargetList {
        TargetList::new(Arc::new(MemoryBlobStore::new()), DEFAULT_TARGETS_PATH)
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates() -> anyhow::Result<()> {
        let targets = list();
        assert!(targets.add(TrackedTarget::new("Acme", "Shoes", "Running")).await?);
        assert!(!targets.add(TrackedTarget::new("acme", "shoes", "running")).await?);
        assert!(targets.add(TrackedTarget::new("Acme", "Shoes", "Hiking")).await?);
        assert_eq!(targets.load().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_narrowed() -> anyhow::Result<()> {
        let targets = list();
        targets.add(TrackedTarget::new("Acme", "Shoes", "Running")).await?;
        targets.add(TrackedTarget::new("Acme", "Shoes", "Hiking")).await?;
        assert_eq!(targets.remove("ACME", None, Some("hiking")).await?, 1);
        assert_eq!(targets.remove("Nobody", None, None).await?, 0);
        assert_eq!(targets.remove("acme", None, None).await?, 1);
        assert!(targets.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_non_ascii_names_compare_case_insensitively() -> anyhow::Result<()> {
        let targets = list();
        assert!(targets.add(TrackedTarget::new("Nestlé", "Café", "Épicerie")).await?);
        assert!(!targets.add(TrackedTarget::new("NESTLÉ", "CAFÉ", "épicerie")).await?);
        assert_eq!(targets.remove("nestlé", Some("CAFÉ"), None).await?, 1);
        assert!(targets.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_garbage_config_loads_empty() -> anyhow::Result<()> {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.write(DEFAULT_TARGETS_PATH, b"{oops", "test").await?;
        let targets = TargetList::new(blobs, DEFAULT_TARGETS_PATH);
        assert!(targets.load().await.is_empty());
        assert!(targets.try_load().await.is_err());
        Ok(())
    }
}
