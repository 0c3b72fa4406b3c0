//! Common types shared across the store wrappers and backends.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A stored value with its self-describing content type, so a single key
/// namespace can hold both text and binary payloads without ambiguity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Metadata persisted alongside each stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Content type of the stored body.
    pub content_type: String,
    /// Unix seconds when the object was written.
    pub stored_at: u64,
    /// Unix seconds when the object stops being served; `None` means the
    /// object never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Size of the stored body in bytes.
    pub size: u64,
}

impl ObjectMeta {
    pub fn new(content_type: impl Into<String>, size: u64) -> Self {
        Self {
            content_type: content_type.into(),
            stored_at: now_unix(),
            expires_at: None,
            size,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(self.stored_at + ttl.as_secs());
        self
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => now_unix() >= expires_at,
            None => false,
        }
    }
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a backend lookup: body plus metadata, or a miss.
pub type LookupResult = StoreResult<Option<(Bytes, ObjectMeta)>>;
