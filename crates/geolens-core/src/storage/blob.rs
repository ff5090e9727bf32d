use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Whole-file key/value storage.
///
/// `read` returns `Ok(None)` when the path does not exist; `Err` is reserved
/// for the backend being unreachable or misbehaving.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn write(&self, path: &str, bytes: &[u8], message: &str) -> anyhow::Result<()>;
    fn backend_name(&self) -> &'static str;
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", full.display())),
        }
    }

    async fn write(&self, path: &str, bytes: &[u8], _message: &str) -> anyhow::Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .with_context(|| format!("failed to write {}", full.display()))
    }

    fn backend_name(&self) -> &'static str {
        "fs"
    }
}

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(blobs.get(path).cloned())
    }

    async fn write(&self, path: &str, bytes: &[u8], _message: &str) -> anyhow::Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        blobs.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_missing_is_none() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FsBlobStore::new(dir.path());
        assert!(store.read("nope.csv").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_fs_write_creates_parents() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FsBlobStore::new(dir.path().join("nested"));
        store.write("data/history.csv", b"a,b\n", "test").await?;
        assert_eq!(store.read("data/history.csv").await?, Some(b"a,b\n".to_vec()));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fs_concurrent_writes_on_runtime() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(FsBlobStore::new(dir.path()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .write(&format!("runs/{i}.csv"), format!("{i}").as_bytes(), "test")
                        .await
                })
            })
            .collect();
        for h in handles {
            h.await??;
        }
        assert_eq!(store.read("runs/7.csv").await?, Some(b"7".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_roundtrip() -> anyhow::Result<()> {
        let store = MemoryBlobStore::new();
        store.write("x", b"1", "test").await?;
        let clone = store.clone();
        assert_eq!(clone.read("x").await?, Some(b"1".to_vec()));
        Ok(())
    }
}
