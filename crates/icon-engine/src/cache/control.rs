//! Edge cache-control policies.
//!
//! The values are fixed by contract: resolved images are immutable for a
//! year, misses are revisited after four hours, and transient errors are
//! absorbed by the edge for ten minutes.

use super::key::aligned_ttl_at;
use super::types::now_unix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Successfully resolved image.
    Immutable,
    /// All candidates exhausted; revisit the miss soon.
    NotFound,
    /// Transient failure; keep the edge from hammering origin.
    Error,
    /// Expire at the next wall-clock boundary of this many seconds.
    Interval(u64),
}

impl CachePolicy {
    /// Render the `Cache-Control` (and `CDN-Cache-Control`) value.
    pub fn header_value(&self) -> String {
        match self {
            Self::Immutable => "public, max-age=31536000, immutable".to_string(),
            Self::NotFound => "public, max-age=14400".to_string(),
            Self::Error => "public, max-age=600".to_string(),
            Self::Interval(interval) => {
                format!("public, max-age={}", aligned_ttl_at(*interval, now_unix()))
            }
        }
    }
}
