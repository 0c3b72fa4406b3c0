//! Fast and durable store wrappers.
//!
//! Both wrappers share the same policy on the request path: no backend
//! failure ever crosses this boundary. Reads degrade to misses and writes
//! report `false`, logged and forgotten — the system optimizes for request
//! latency over cache completeness, so there are no retries. Purge goes
//! through `try_delete`, which keeps the error so "nothing to delete" and
//! "deletion failed" stay distinguishable.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::cache::providers::ObjectStore;
use crate::cache::types::{ObjectMeta, StoreResult, StoredObject};

/// Fast, ephemeral cache for rendered responses (and the compiled token
/// list). Entries may carry a TTL; expired entries read as misses.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn ObjectStore>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        match self.backend.get(key).await {
            Ok(Some((body, meta))) => Some(StoredObject {
                body,
                content_type: meta.content_type,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        ttl: Option<Duration>,
    ) -> bool {
        let mut meta = ObjectMeta::new(content_type, body.len() as u64);
        if let Some(ttl) = ttl {
            meta = meta.with_ttl(ttl);
        }
        match self.backend.put(key, body, meta).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "cache write failed");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "cache delete failed");
                false
            }
        }
    }

    /// Delete, surfacing the backend error. Used by purge, which must
    /// report failures instead of swallowing them.
    pub async fn try_delete(&self, key: &str) -> StoreResult<()> {
        self.backend.delete(key).await
    }
}

/// Durable system of record for raw, unresized assets. Entries never
/// expire; a failed write simply means the object is re-fetched on the
/// next miss.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn ObjectStore>,
}

impl DurableStore {
    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self { backend }
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.backend.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(key, error = %e, "durable existence check failed");
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        match self.backend.get(key).await {
            // An entry with an empty body is indistinguishable from a
            // failed write; treat it as a miss.
            Ok(Some((body, _))) if body.is_empty() => None,
            Ok(Some((body, meta))) => Some(StoredObject {
                body,
                content_type: meta.content_type,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "durable read failed, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, body: Bytes, content_type: &str) -> bool {
        let meta = ObjectMeta::new(content_type, body.len() as u64);
        match self.backend.put(key, body, meta).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "durable write failed");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "durable delete failed");
                false
            }
        }
    }

    /// Delete, surfacing the backend error (see [`CacheStore::try_delete`]).
    pub async fn try_delete(&self, key: &str) -> StoreResult<()> {
        self.backend.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::providers::MemoryStore;

    fn stores() -> (CacheStore, DurableStore) {
        (
            CacheStore::new(Arc::new(MemoryStore::new(1 << 20))),
            DurableStore::new(Arc::new(MemoryStore::new(1 << 20))),
        )
    }

    #[tokio::test]
    async fn cache_set_then_get_round_trips() {
        let (cache, _) = stores();
        assert!(
            cache
                .set("k", Bytes::from_static(b"body"), "image/webp", None)
                .await
        );
        let obj = cache.get("k").await.expect("hit");
        assert_eq!(obj.body, Bytes::from_static(b"body"));
        assert_eq!(obj.content_type, "image/webp");
    }

    #[tokio::test]
    async fn cache_ttl_expires_to_miss() {
        let (cache, _) = stores();
        cache
            .set(
                "k",
                Bytes::from_static(b"body"),
                "image/webp",
                Some(Duration::ZERO),
            )
            .await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn durable_empty_body_is_a_miss() {
        let (_, durable) = stores();
        assert!(durable.put("k", Bytes::new(), "image/png").await);
        assert!(durable.get("k").await.is_none());
    }

    #[tokio::test]
    async fn durable_round_trip_and_delete() {
        let (_, durable) = stores();
        durable.put("k", Bytes::from_static(b"raw"), "image/png").await;
        assert!(durable.exists("k").await);
        assert!(durable.delete("k").await);
        assert!(!durable.exists("k").await);
        durable.try_delete("k").await.expect("absent delete is ok");
    }
}
