//! Origin access.
//!
//! The trait seam keeps the engine testable without a network; the
//! production implementation rides the shared reqwest client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::trace;

use crate::error::FetchError;

/// A fetched and validated origin image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub body: Bytes,
    pub content_type: String,
}

/// Access to external origins.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetch a URL expected to yield an image. Validation is part of the
    /// contract: a non-success status or a content type that does not
    /// start with `image/` is an error, which advances the fallback chain.
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, FetchError>;

    /// Fetch a JSON document (token lists, collection metadata).
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Production fetcher over HTTP.
pub struct HttpFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }
}

#[async_trait]
impl OriginFetcher for HttpFetcher {
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, FetchError> {
        trace!(url, "fetching origin image");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(FetchError::NotAnImage { content_type });
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }

        let body = response.bytes().await?;
        if body.len() > self.max_bytes {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        Ok(FetchedImage { body, content_type })
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        trace!(url, "fetching origin json");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(response.json().await?)
    }
}
