//! Backend contract shared by the fast and durable stores.

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::types::{LookupResult, ObjectMeta, StoreResult};

/// A key/value object store holding bodies with their metadata.
///
/// Backends report failures as [`crate::error::StoreError`]; the store
/// wrappers decide whether a failure is surfaced or degraded to a miss.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether the store holds an entry for the key.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Get an entry, or `None` on a miss.
    async fn get(&self, key: &str) -> LookupResult;

    /// Put an entry, overwriting any previous value.
    async fn put(&self, key: &str, body: Bytes, meta: ObjectMeta) -> StoreResult<()>;

    /// Delete an entry. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
