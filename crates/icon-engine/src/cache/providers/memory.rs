//! In-memory backend for the fast store, built on Moka.

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::providers::ObjectStore;
use crate::cache::types::{LookupResult, ObjectMeta, StoreResult};

#[derive(Clone)]
struct MemEntry {
    body: Bytes,
    meta: ObjectMeta,
}

/// Size-bounded in-memory store. Expiry is carried in the entry metadata
/// and checked on read, so per-entry TTLs work without a global cache TTL.
#[derive(Clone)]
pub struct MemoryStore {
    cache: MokaCache<String, MemEntry>,
    max_size: u64,
}

impl MemoryStore {
    /// Create a new memory store bounded to `max_size_bytes` of bodies.
    pub fn new(max_size_bytes: u64) -> Self {
        assert!(max_size_bytes > 0, "memory store size must be greater than zero");

        let cache = MokaCache::builder()
            .weigher(|_k, v: &MemEntry| v.body.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(max_size = max_size_bytes, "memory store created");

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> LookupResult {
        if let Some(entry) = self.cache.get(key).await {
            // Expiry lives in the metadata; expired entries read as misses
            // and are dropped eagerly.
            if entry.meta.is_expired() {
                debug!(key, "memory store entry expired");
                self.cache.invalidate(key).await;
                return Ok(None);
            }
            return Ok(Some((entry.body.clone(), entry.meta.clone())));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, body: Bytes, meta: ObjectMeta) -> StoreResult<()> {
        // A single entry larger than the whole cache can never be admitted.
        if body.len() as u64 > self.max_size {
            warn!(
                key,
                size = body.len(),
                max_size = self.max_size,
                "entry too large for memory store, skipping"
            );
            return Ok(());
        }

        self.cache
            .insert(key.to_string(), MemEntry { body, meta })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn meta(content_type: &str, size: u64) -> ObjectMeta {
        ObjectMeta::new(content_type, size)
    }

    #[tokio::test]
    async fn round_trip_returns_body_and_type() {
        let store = MemoryStore::new(1024);
        let body = Bytes::from_static(b"payload");
        store
            .put("k", body.clone(), meta("image/webp", body.len() as u64))
            .await
            .unwrap();

        let (got_body, got_meta) = store.get("k").await.unwrap().expect("hit");
        assert_eq!(got_body, body);
        assert_eq!(got_meta.content_type, "image/webp");
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let store = MemoryStore::new(1024);
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let store = MemoryStore::new(1024);
        let body = Bytes::from_static(b"stale");
        let meta = meta("text/plain", body.len() as u64).with_ttl(Duration::ZERO);
        store.put("k", body, meta).await.unwrap();

        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_entry_is_not_admitted() {
        let store = MemoryStore::new(4);
        let body = Bytes::from_static(b"way too large");
        store
            .put("k", body.clone(), meta("text/plain", body.len() as u64))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new(1024);
        store
            .put("k", Bytes::from_static(b"x"), meta("text/plain", 1))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
