//! # Read-Through Engine
//!
//! Orchestrates the per-request state machine: fast-cache lookup, durable
//! store lookup, fallback-chain resolution, transform, and store
//! population. The engine owns its dependency context — stores, resolver,
//! compiler, and origin fetcher are injected at construction and shared
//! across all concurrent requests.

use std::path::Path;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use imgpipe::{ResizeParams, TransformOutput, transform_async, transform_stream};

use crate::cache::{
    CachePolicy, CacheStore, DurableStore, StoredObject, TOKEN_LIST_KEY, aligned_ttl,
    canonical_key,
};
use crate::config::EngineConfig;
use crate::error::{FetchError, IconError};
use crate::fetch::{FetchedImage, OriginFetcher};
use crate::resolver::{AssetIdentifier, AssetResolver, Candidate, Resolution};
use crate::tokenlist::{TokenList, TokenListCompiler};

/// One icon request: the logical asset, its canonical cache key, and the
/// requested rendering.
#[derive(Debug, Clone)]
pub struct IconRequest {
    pub asset: AssetIdentifier,
    pub cache_key: String,
    pub resize: ResizeParams,
}

impl IconRequest {
    /// Build a request; the cache key is derived from the raw request path
    /// plus query string.
    pub fn new(asset: AssetIdentifier, path_and_query: &str, resize: ResizeParams) -> Self {
        Self {
            asset,
            cache_key: canonical_key(path_and_query),
            resize,
        }
    }
}

/// Terminal request outcomes. The HTTP boundary branches on these three
/// variants and nothing else.
#[derive(Debug)]
pub enum IconOutcome {
    /// Rendered payload plus content type.
    Hit(StoredObject),
    /// All candidates exhausted (or the asset is denylisted).
    NotFound,
    /// Unexpected failure during resolution or transform.
    Error(IconError),
}

impl IconOutcome {
    pub fn cache_policy(&self) -> CachePolicy {
        match self {
            Self::Hit(_) => CachePolicy::Immutable,
            Self::NotFound => CachePolicy::NotFound,
            Self::Error(_) => CachePolicy::Error,
        }
    }
}

/// Outcome of a palette request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteOutcome {
    Color { color: String, policy: CachePolicy },
    NotFound,
}

/// Report of a durable-store logo prefetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub processed: usize,
    pub stored: usize,
}

struct EngineInner {
    config: EngineConfig,
    cache: CacheStore,
    durable: DurableStore,
    resolver: AssetResolver,
    compiler: TokenListCompiler,
    fetcher: Arc<dyn OriginFetcher>,
}

/// The read-through cache orchestrator. Cheap to clone and share across
/// concurrent requests.
#[derive(Clone)]
pub struct IconEngine {
    inner: Arc<EngineInner>,
}

impl IconEngine {
    pub fn new(
        config: EngineConfig,
        cache: CacheStore,
        durable: DurableStore,
        fetcher: Arc<dyn OriginFetcher>,
    ) -> Self {
        let resolver = AssetResolver::new(config.assets_root.clone(), config.resolver.clone());
        let compiler = TokenListCompiler::new(fetcher.clone(), config.sources.clone());
        Self {
            inner: Arc::new(EngineInner {
                config,
                cache,
                durable,
                resolver,
                compiler,
                fetcher,
            }),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    pub fn durable(&self) -> &DurableStore {
        &self.inner.durable
    }

    pub fn category_allowed(&self, category: &str) -> bool {
        self.inner.resolver.category_allowed(category)
    }

    /// Serve a rendered icon.
    ///
    /// A successful resolution always populates the fast cache before
    /// returning, so a repeated identical request is a pure cache hit.
    pub async fn get_icon(&self, request: &IconRequest) -> IconOutcome {
        if let Some(rendered) = self.inner.cache.get(&request.cache_key).await {
            debug!(key = %request.cache_key, "cache hit");
            return IconOutcome::Hit(rendered);
        }

        match self.resolve_and_render(request).await {
            Ok(Some(output)) => {
                let rendered = StoredObject {
                    body: output.payload.clone(),
                    content_type: output.content_type.to_string(),
                };
                self.inner
                    .cache
                    .set(&request.cache_key, output.payload, output.content_type, None)
                    .await;
                IconOutcome::Hit(rendered)
            }
            Ok(None) => {
                debug!(key = %request.cache_key, "all candidates exhausted");
                IconOutcome::NotFound
            }
            Err(e) => {
                warn!(key = %request.cache_key, error = %e, "icon resolution failed");
                IconOutcome::Error(e)
            }
        }
    }

    async fn resolve_and_render(
        &self,
        request: &IconRequest,
    ) -> Result<Option<TransformOutput>, IconError> {
        let candidates = match self.inner.resolver.resolve(&request.asset, None) {
            Resolution::Denied => return Ok(None),
            Resolution::Candidates(candidates) => candidates,
        };

        if let Some(output) = self.try_candidates(request, &candidates).await? {
            return Ok(Some(output));
        }

        // Token remote candidates need the compiled list; it is only
        // materialized once the durable blob has missed.
        if let AssetIdentifier::Token { .. } = request.asset {
            let list = self.token_list_table().await;
            if let Resolution::Candidates(candidates) =
                self.inner.resolver.resolve(&request.asset, Some(&list.tokens))
            {
                let remote: Vec<Candidate> = candidates
                    .into_iter()
                    .filter(|c| matches!(c, Candidate::RemoteUrl(_)))
                    .collect();
                return self.try_candidates(request, &remote).await;
            }
        }

        Ok(None)
    }

    /// Evaluate candidates left to right: validate, else continue.
    async fn try_candidates(
        &self,
        request: &IconRequest,
        candidates: &[Candidate],
    ) -> Result<Option<TransformOutput>, IconError> {
        for candidate in candidates {
            match candidate {
                Candidate::LocalAsset(path) => {
                    if let Some(output) = self.render_local(path, request.resize).await? {
                        return Ok(Some(output));
                    }
                }

                Candidate::StoredBlob(key) => {
                    if let Some(blob) = self.inner.durable.get(key).await {
                        let output = transform_async(request.resize, blob.body).await?;
                        return Ok(Some(output));
                    }
                }

                Candidate::RemoteUrl(url) => {
                    match self.inner.fetcher.fetch_image(url).await {
                        Ok(image) => return self.store_and_render(request, image).await.map(Some),
                        Err(e) => {
                            debug!(url, error = %e, "origin candidate failed, trying next");
                        }
                    }
                }

                Candidate::MetadataImage(url) => {
                    match self.fetch_metadata_image(url).await {
                        Ok(image) => return self.store_and_render(request, image).await.map(Some),
                        Err(e) => {
                            debug!(url, error = %e, "metadata candidate failed, trying next");
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Render a bundled asset, streaming it from disk through the
    /// pipeline. A missing file is not an error — the chain moves on.
    async fn render_local(
        &self,
        path: &Path,
        resize: ResizeParams,
    ) -> Result<Option<TransformOutput>, IconError> {
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let streamed = transform_stream(
            resize,
            ReaderStream::new(file),
            self.inner.config.max_origin_bytes,
        )
        .await?;

        let content_type = streamed.content_type;
        let mut payload = BytesMut::new();
        let mut stream = streamed.stream;
        while let Some(chunk) = stream.next().await {
            payload.extend_from_slice(&chunk?);
        }

        Ok(Some(TransformOutput {
            content_type,
            payload: payload.freeze(),
        }))
    }

    /// Persist the raw origin bytes (the durable store is the system of
    /// record for unresized assets), then render the response.
    async fn store_and_render(
        &self,
        request: &IconRequest,
        image: FetchedImage,
    ) -> Result<TransformOutput, IconError> {
        if let Some(key) = request.asset.durable_key() {
            self.inner
                .durable
                .put(&key, image.body.clone(), &image.content_type)
                .await;
        }
        Ok(transform_async(request.resize, image.body).await?)
    }

    async fn fetch_metadata_image(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let doc = self.inner.fetcher.fetch_json(url).await?;
        let image_url = doc
            .pointer(&self.inner.config.resolver.collection_image_pointer)
            .and_then(Value::as_str)
            .ok_or(FetchError::MissingImageUrl)?;
        self.inner.fetcher.fetch_image(image_url).await
    }

    /// The compiled token list, read through the fast cache under its
    /// fixed key with an interval-aligned TTL.
    async fn token_list_table(&self) -> TokenList {
        if let Some(cached) = self.inner.cache.get(TOKEN_LIST_KEY).await {
            match serde_json::from_slice::<TokenList>(&cached.body) {
                Ok(list) => return list,
                Err(e) => warn!(error = %e, "cached token list is unreadable, recompiling"),
            }
        }

        let list = self.inner.compiler.compile().await;
        match serde_json::to_vec(&list) {
            Ok(payload) => {
                let ttl = aligned_ttl(self.inner.config.token_list_interval);
                self.inner
                    .cache
                    .set(TOKEN_LIST_KEY, Bytes::from(payload), "application/json", Some(ttl))
                    .await;
            }
            Err(e) => warn!(error = %e, "token list serialization failed"),
        }
        list
    }

    /// Serve the compiled token list as JSON with the aligned policy.
    pub async fn token_list(&self) -> (Bytes, CachePolicy) {
        let policy = CachePolicy::Interval(self.inner.config.token_list_interval.as_secs());

        if let Some(cached) = self.inner.cache.get(TOKEN_LIST_KEY).await {
            return (cached.body, policy);
        }

        let list = self.token_list_table().await;
        let payload = serde_json::to_vec(&list).unwrap_or_else(|_| b"{\"tokens\":{}}".to_vec());
        (Bytes::from(payload), policy)
    }

    /// Warm the durable store: fetch the large variant of every compiled
    /// logo hosted on the prefetch origin whose blob is absent.
    pub async fn prefetch_token_logos(&self) -> PrefetchReport {
        let list = self.token_list_table().await;
        let mut report = PrefetchReport::default();

        for (chain_id, tokens) in &list.tokens {
            for (address, url) in tokens {
                report.processed += 1;
                if report.processed % 25 == 0 {
                    debug!(processed = report.processed, "prefetch progress");
                }

                if !url.starts_with(&self.inner.config.prefetch_origin) {
                    continue;
                }
                let key = crate::cache::token_blob_key(*chain_id, address);
                if self.inner.durable.exists(&key).await {
                    continue;
                }

                let hd_url = url.replace("/thumb/", "/large/");
                match self.inner.fetcher.fetch_image(&hd_url).await {
                    Ok(image) => {
                        if self
                            .inner
                            .durable
                            .put(&key, image.body, &image.content_type)
                            .await
                        {
                            info!(url = %hd_url, "stored prefetched logo");
                            report.stored += 1;
                        }
                    }
                    Err(e) => debug!(url = %hd_url, error = %e, "logo prefetch failed"),
                }
            }
        }

        report
    }

    /// Dominant color of a bundled asset. Non-default colors are stable,
    /// so they carry the long-lived policy.
    pub async fn palette(&self, category: &str, name: &str) -> PaletteOutcome {
        if !self.inner.resolver.category_allowed(category) {
            return PaletteOutcome::NotFound;
        }
        let Some(path) = self.inner.resolver.local_asset(category, name) else {
            return PaletteOutcome::NotFound;
        };

        match tokio::fs::read(&path).await {
            Ok(raw) => {
                let color =
                    tokio::task::spawn_blocking(move || imgpipe::dominant_color_or_default(&raw))
                        .await
                        .unwrap_or_else(|_| imgpipe::DEFAULT_COLOR.to_string());
                let policy = if color == imgpipe::DEFAULT_COLOR {
                    CachePolicy::NotFound
                } else {
                    CachePolicy::Immutable
                };
                PaletteOutcome::Color { color, policy }
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "palette asset read failed");
                PaletteOutcome::NotFound
            }
        }
    }
}
