//! # Purge Coordination
//!
//! Invalidates assets from the fast cache, the durable store, and the CDN
//! edge. Purge is a best-effort convergence operation: sub-operations run
//! concurrently, overall success requires all of them to succeed, and
//! completed deletions are never rolled back — retrying is always safe.

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, DurableStore, key_from_url};
use crate::config::CdnConfig;
use crate::error::PurgeError;

/// Issues edge-purge requests against the CDN API.
pub struct CdnPurger {
    client: Client,
    endpoint: String,
    token: String,
}

impl CdnPurger {
    pub fn new(client: Client, config: CdnConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint,
            token: config.token,
        }
    }

    /// Purge the literal URL list from the edge.
    pub async fn purge(&self, urls: &[String]) -> Result<(), PurgeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "files": urls }))
            .send()
            .await
            .map_err(|e| PurgeError::Cdn(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PurgeError::Cdn(format!("edge purge returned {status}")));
        }

        debug!(urls = urls.len(), "edge purge accepted");
        Ok(())
    }
}

/// Coordinates purges across both stores and the CDN.
pub struct PurgeCoordinator {
    cache: CacheStore,
    durable: DurableStore,
    cdn: Option<CdnPurger>,
}

impl PurgeCoordinator {
    pub fn new(cache: CacheStore, durable: DurableStore, cdn: Option<CdnPurger>) -> Self {
        Self {
            cache,
            durable,
            cdn,
        }
    }

    /// Purge a list of absolute URLs.
    ///
    /// Each URL's canonical key (path + query, scheme/host ignored) is
    /// deleted from both stores; deleting an absent key succeeds. The CDN
    /// leg runs concurrently with the store deletions.
    pub async fn purge(&self, urls: &[String]) -> Result<(), PurgeError> {
        let keys: Vec<String> = urls.iter().filter_map(|url| key_from_url(url)).collect();
        if keys.len() < urls.len() {
            warn!(
                skipped = urls.len() - keys.len(),
                "some purge URLs did not parse and were skipped"
            );
        }

        let stores = async {
            for key in &keys {
                self.cache
                    .try_delete(key)
                    .await
                    .map_err(|source| PurgeError::Store {
                        key: key.clone(),
                        source,
                    })?;
                self.durable
                    .try_delete(key)
                    .await
                    .map_err(|source| PurgeError::Store {
                        key: key.clone(),
                        source,
                    })?;
            }
            Ok(())
        };

        let edge = async {
            match &self.cdn {
                Some(cdn) => cdn.purge(urls).await,
                None => Ok(()),
            }
        };

        let (stores_result, edge_result) = tokio::join!(stores, edge);
        stores_result.and(edge_result)?;

        info!(urls = urls.len(), keys = keys.len(), "purge completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use bytes::Bytes;
    use std::sync::Arc;

    fn coordinator() -> (CacheStore, DurableStore, PurgeCoordinator) {
        let cache = CacheStore::new(Arc::new(MemoryStore::new(1 << 20)));
        let durable = DurableStore::new(Arc::new(MemoryStore::new(1 << 20)));
        let coordinator = PurgeCoordinator::new(cache.clone(), durable.clone(), None);
        (cache, durable, coordinator)
    }

    #[tokio::test]
    async fn purge_removes_entries_from_both_stores() {
        let (cache, durable, coordinator) = coordinator();
        let url = "https://icons.example.com/icons/protocols/aave?w=64".to_string();
        let key = key_from_url(&url).unwrap();

        cache
            .set(&key, Bytes::from_static(b"rendered"), "image/webp", None)
            .await;
        durable.put(&key, Bytes::from_static(b"raw"), "image/png").await;

        coordinator.purge(&[url]).await.expect("purge should succeed");
        assert!(cache.get(&key).await.is_none());
        assert!(durable.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn purging_absent_keys_still_succeeds() {
        let (_, _, coordinator) = coordinator();
        let urls = vec!["https://icons.example.com/icons/never/stored?w=1".to_string()];
        coordinator.purge(&urls).await.expect("absent keys are fine");
    }

    #[tokio::test]
    async fn unparseable_urls_are_skipped() {
        let (_, _, coordinator) = coordinator();
        let urls = vec!["not a url at all".to_string()];
        coordinator.purge(&urls).await.expect("nothing to delete");
    }
}
