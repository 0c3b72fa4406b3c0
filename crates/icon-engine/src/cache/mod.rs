//! # Cache System
//!
//! Store wrappers, key canonicalization, TTL alignment, and cache-control
//! policies for the read-through pipeline.

mod control;
mod key;
pub mod providers;
mod store;
mod types;

pub use control::CachePolicy;
pub use key::{
    TOKEN_LIST_KEY, aligned_ttl, canonical_key, collection_blob_key, key_from_url, token_blob_key,
};
pub use store::{CacheStore, DurableStore};
pub use types::{LookupResult, ObjectMeta, StoreResult, StoredObject};

pub use providers::{FileStore, MemoryStore, ObjectStore};
