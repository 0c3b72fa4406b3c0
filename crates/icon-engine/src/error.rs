use reqwest::StatusCode;
use thiserror::Error;

/// Failure inside a store backend.
///
/// These never escape the store wrappers on the request path: reads treat
/// them as misses and writes as silent no-ops. Purge keeps them so callers
/// can tell "nothing to delete" from "deletion failed".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Failure fetching an origin candidate.
///
/// Every variant advances the fallback chain; `NotAnImage` is the
/// validation failure from the candidate contract.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("origin returned status code {0}")]
    Status(StatusCode),

    #[error("origin returned non-image content type {content_type:?}")]
    NotAnImage { content_type: String },

    #[error("origin payload exceeds {0} bytes")]
    TooLarge(usize),

    #[error("metadata document carries no image URL")]
    MissingImageUrl,
}

/// Fatal request failure, surfaced to the HTTP boundary as a 500 with a
/// short-TTL cache header.
#[derive(Debug, Error)]
pub enum IconError {
    #[error("transform failed: {0}")]
    Transform(#[from] imgpipe::PipelineError),

    #[error("asset read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Purge failure. Already-completed deletions are not rolled back.
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("store deletion failed for {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("CDN purge failed: {0}")]
    Cdn(String),
}
