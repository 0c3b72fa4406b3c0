//! Filesystem backend for the durable store.
//!
//! Objects land under a shard directory named after the first key segment
//! (`token/...`, `collection/...`), with sha256-hashed file names and a
//! JSON metadata sidecar next to each body.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::warn;

use crate::cache::providers::ObjectStore;
use crate::cache::types::{LookupResult, ObjectMeta, StoreResult};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    initialized: Arc<AtomicBool>,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn ensure_initialized(&self) -> std::io::Result<()> {
        if self.initialized.load(Ordering::Relaxed) {
            return Ok(());
        }

        if self
            .initialized
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            fs::create_dir_all(&self.root).await?;
            self.initialized.store(true, Ordering::Release);
        } else {
            while !self.initialized.load(Ordering::Acquire) {
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let shard = key.split('/').next().unwrap_or("object");
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        self.root.join(shard).join(format!("{hash:x}"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        let mut path = self.object_path(key);
        path.set_extension("meta");
        path
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.ensure_initialized().await?;

        let data_exists = fs::try_exists(self.object_path(key)).await?;
        let meta_exists = fs::try_exists(self.meta_path(key)).await?;
        Ok(data_exists && meta_exists)
    }

    async fn get(&self, key: &str) -> LookupResult {
        self.ensure_initialized().await?;

        let data_path = self.object_path(key);
        let meta_path = self.meta_path(key);

        let meta_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let meta: ObjectMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                // A corrupt sidecar makes the object unreadable; drop the
                // pair so the next miss re-derives it.
                warn!(path = ?meta_path, error = %e, "corrupt store metadata, discarding entry");
                let _ = fs::remove_file(&data_path).await;
                let _ = fs::remove_file(&meta_path).await;
                return Ok(None);
            }
        };

        if meta.is_expired() {
            let _ = fs::remove_file(&data_path).await;
            let _ = fs::remove_file(&meta_path).await;
            return Ok(None);
        }

        let body = match fs::read(&data_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some((Bytes::from(body), meta)))
    }

    async fn put(&self, key: &str, body: Bytes, meta: ObjectMeta) -> StoreResult<()> {
        self.ensure_initialized().await?;

        let data_path = self.object_path(key);
        if let Some(parent) = data_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let meta_bytes = serde_json::to_vec(&meta)?;
        fs::write(&data_path, &body).await?;
        fs::write(self.meta_path(key), &meta_bytes).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_initialized().await?;

        for path in [self.object_path(key), self.meta_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[tokio::test]
    async fn round_trip_preserves_body_and_type() {
        let (_dir, store) = store();
        let body = Bytes::from_static(b"\x89PNG...");
        store
            .put(
                "token/1/0xabc",
                body.clone(),
                ObjectMeta::new("image/png", body.len() as u64),
            )
            .await
            .unwrap();

        let (got_body, got_meta) = store.get("token/1/0xabc").await.unwrap().expect("hit");
        assert_eq!(got_body, body);
        assert_eq!(got_meta.content_type, "image/png");
        assert!(store.exists("token/1/0xabc").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_a_miss_and_delete_is_idempotent() {
        let (_dir, store) = store();
        assert!(store.get("token/1/0xmissing").await.unwrap().is_none());
        store.delete("token/1/0xmissing").await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_both_files() {
        let (_dir, store) = store();
        store
            .put(
                "collection/0xdef",
                Bytes::from_static(b"blob"),
                ObjectMeta::new("image/png", 4),
            )
            .await
            .unwrap();
        store.delete("collection/0xdef").await.unwrap();
        assert!(!store.exists("collection/0xdef").await.unwrap());
        assert!(store.get("collection/0xdef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_metadata_reads_as_miss() {
        let (_dir, store) = store();
        store
            .put(
                "token/1/0xabc",
                Bytes::from_static(b"blob"),
                ObjectMeta::new("image/png", 4),
            )
            .await
            .unwrap();
        fs::write(store.meta_path("token/1/0xabc"), b"{not json")
            .await
            .unwrap();

        assert!(store.get("token/1/0xabc").await.unwrap().is_none());
    }
}
