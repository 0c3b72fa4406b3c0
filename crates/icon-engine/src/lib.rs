//! # Icon Engine
//!
//! Read-through, multi-tier asset cache and resolution pipeline for icon
//! serving. Given a logical asset identifier and resize parameters, the
//! engine serves a rendered image from a fast cache, a durable store, or
//! an ordered chain of external origins, normalizing and persisting the
//! result along the way.
//!
//! ## Features
//!
//! - Fast/durable store wrappers with a never-throw hot path
//! - Canonical cache keys and wall-clock-aligned TTLs
//! - Ordered fallback-chain resolution per asset kind
//! - Token-list compilation from multiple upstream sources
//! - Purge coordination across both stores and the CDN edge

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod purge;
pub mod resolver;
pub mod tokenlist;

pub use cache::{
    CachePolicy, CacheStore, DurableStore, FileStore, MemoryStore, ObjectMeta, ObjectStore,
    StoredObject, TOKEN_LIST_KEY, aligned_ttl, canonical_key, collection_blob_key, key_from_url,
    token_blob_key,
};
pub use config::{CdnConfig, EngineConfig, create_client};
pub use engine::{IconEngine, IconOutcome, IconRequest, PaletteOutcome, PrefetchReport};
pub use error::{FetchError, IconError, PurgeError, StoreError};
pub use fetch::{FetchedImage, HttpFetcher, OriginFetcher};
pub use purge::{CdnPurger, PurgeCoordinator};
pub use resolver::{AssetIdentifier, AssetResolver, Candidate, Resolution, ResolverConfig};
pub use tokenlist::{ListSource, SourceKind, TokenList, TokenListCompiler, TokenListTable};
