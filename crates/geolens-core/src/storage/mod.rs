pub mod blob;
pub mod github;
pub mod history;
pub mod sqlite;
pub mod targets;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use history::{HistoryStore, HistoryTable};
pub use targets::TargetList;

use crate::config::{StoreBackend, StoreSettings};
use crate::errors::ConfigError;
use std::sync::Arc;

/// Build the configured backend. Settings are resolved before this point;
/// nothing here reads the environment.
pub fn open_blob_store(cfg: &StoreSettings) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match cfg.backend {
        StoreBackend::Fs => Arc::new(FsBlobStore::new(&cfg.path)),
        StoreBackend::Sqlite => Arc::new(sqlite::SqliteBlobStore::open(&cfg.path)?),
        StoreBackend::Memory => Arc::new(MemoryBlobStore::new()),
        StoreBackend::Github => {
            let repo = cfg
                .repo
                .clone()
                .ok_or_else(|| ConfigError("github store requires store.repo".into()))?;
            let token = cfg.token.clone().ok_or_else(|| {
                ConfigError(format!(
                    "github store requires a token (set {})",
                    cfg.token_env
                ))
            })?;
            let mut store = github::GithubBlobStore::new(repo, cfg.branch.clone(), token);
            if let Some(root) = &cfg.api_root {
                store = store.with_api_root(root.as_str());
            }
            Arc::new(store)
        }
    };
    tracing::debug!(event = "geolens.store.opened", backend = store.backend_name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_store_needs_token() {
        let cfg = StoreSettings {
            backend: StoreBackend::Github,
            repo: Some("org/repo".into()),
            ..Default::default()
        };
        let err = open_blob_store(&cfg).err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("GH_TOKEN")));
    }

    #[test]
    fn test_github_store_with_enterprise_root() -> anyhow::Result<()> {
        let cfg = StoreSettings {
            backend: StoreBackend::Github,
            repo: Some("org/repo".into()),
            api_root: Some("https://github.example.com/api/v3/".into()),
            token: Some("ghp_x".into()),
            ..Default::default()
        };
        assert_eq!(open_blob_store(&cfg)?.backend_name(), "github");
        Ok(())
    }

    #[test]
    fn test_memory_backend() -> anyhow::Result<()> {
        let cfg = StoreSettings {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        assert_eq!(open_blob_store(&cfg)?.backend_name(), "memory");
        Ok(())
    }
}
