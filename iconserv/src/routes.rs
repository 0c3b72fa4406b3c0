//! HTTP routes.
//!
//! The handlers are a pure translation layer: extract the identifier and
//! resize parameters, call the engine, and map the tagged outcome onto
//! status, headers, and body. All caching and fallback decisions live in
//! the engine.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Json, Path, Query, State};
use axum::http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use icon_engine::{
    AssetIdentifier, CachePolicy, IconEngine, IconOutcome, IconRequest, PaletteOutcome,
    PurgeCoordinator,
};
use imgpipe::ResizeParams;

const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
const MAX_PURGE_URLS: usize = 30;

#[derive(Clone)]
pub struct AppState {
    pub engine: IconEngine,
    pub purger: Arc<PurgeCoordinator>,
    pub admin_token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/icons/tokens/{chain_id}/{address}", get(token_icon))
        .route("/icons/nfts/{identifier}", get(collection_icon))
        .route("/icons/{category}/{name}", get(bundled_icon))
        .route("/palette/{category}/{name}", get(palette))
        .route("/token-list", get(token_list))
        .route("/purge", post(purge))
        .route("/fetch-and-store-tokens", post(prefetch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn token_icon(
    State(state): State<AppState>,
    Path((chain_id, address)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    let Ok(chain_id) = chain_id.parse::<u64>() else {
        return plain(StatusCode::BAD_REQUEST, "BAD REQUEST", CachePolicy::NotFound);
    };

    let request = IconRequest::new(
        AssetIdentifier::token(chain_id, &address),
        path_and_query(&uri),
        resize_params(&params),
    );
    outcome_response(state.engine.get_icon(&request).await)
}

async fn collection_icon(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    let request = IconRequest::new(
        AssetIdentifier::collection(&identifier),
        path_and_query(&uri),
        resize_params(&params),
    );
    outcome_response(state.engine.get_icon(&request).await)
}

async fn bundled_icon(
    State(state): State<AppState>,
    Path((category, name)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    let request = IconRequest::new(
        AssetIdentifier::bundled(category, name),
        path_and_query(&uri),
        resize_params(&params),
    );
    outcome_response(state.engine.get_icon(&request).await)
}

async fn palette(
    State(state): State<AppState>,
    Path((category, name)): Path<(String, String)>,
) -> Response {
    match state.engine.palette(&category, &name).await {
        PaletteOutcome::Color { color, policy } => with_headers(
            StatusCode::OK,
            "text/plain; charset=utf-8",
            policy,
            Bytes::from(color),
        ),
        PaletteOutcome::NotFound => plain(StatusCode::NOT_FOUND, "NOT FOUND", CachePolicy::NotFound),
    }
}

async fn token_list(State(state): State<AppState>) -> Response {
    let (payload, policy) = state.engine.token_list().await;
    with_headers(StatusCode::OK, "application/json", policy, payload)
}

#[derive(Debug, Deserialize)]
struct PurgeRequest {
    urls: Vec<String>,
}

async fn purge(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::FORBIDDEN, "UNAUTHORIZED").into_response();
    }

    let Ok(request) = serde_json::from_slice::<PurgeRequest>(&body) else {
        return (StatusCode::BAD_REQUEST, "MISSING URL").into_response();
    };
    if request.urls.is_empty() || request.urls.len() > MAX_PURGE_URLS {
        return (StatusCode::BAD_REQUEST, "MISSING URL").into_response();
    }

    match state.purger.purge(&request.urls).await {
        Ok(()) => (StatusCode::OK, "DONE").into_response(),
        Err(e) => {
            error!(error = %e, "purge failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR").into_response()
        }
    }
}

async fn prefetch(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::FORBIDDEN, "UNAUTHORIZED").into_response();
    }

    let report = state.engine.prefetch_token_logos().await;
    Json(serde_json::json!({
        "processed": report.processed,
        "stored": report.stored,
    }))
    .into_response()
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.admin_token else {
        return false;
    };
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {expected}"))
        .unwrap_or(false)
}

fn resize_params(params: &HashMap<String, String>) -> ResizeParams {
    ResizeParams::from_query_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path())
}

fn outcome_response(outcome: IconOutcome) -> Response {
    let policy = outcome.cache_policy();
    match outcome {
        IconOutcome::Hit(rendered) => {
            let content_type = rendered.content_type;
            with_headers(StatusCode::OK, &content_type, policy, rendered.body)
        }
        IconOutcome::NotFound => plain(StatusCode::NOT_FOUND, "NOT FOUND", policy),
        IconOutcome::Error(e) => {
            error!(error = %e, "request failed");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "ERROR", policy)
        }
    }
}

fn plain(status: StatusCode, message: &'static str, policy: CachePolicy) -> Response {
    with_headers(
        status,
        "text/plain; charset=utf-8",
        policy,
        Bytes::from_static(message.as_bytes()),
    )
}

fn with_headers(
    status: StatusCode,
    content_type: &str,
    policy: CachePolicy,
    body: Bytes,
) -> Response {
    let cache_value = policy.header_value();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&cache_value) {
        headers.insert(header::CACHE_CONTROL, value.clone());
        headers.insert(CDN_CACHE_CONTROL, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use icon_engine::{
        CacheStore, DurableStore, EngineConfig, HttpFetcher, MemoryStore, create_client,
    };

    fn make_state(admin_token: Option<&str>) -> AppState {
        let config = EngineConfig {
            sources: Vec::new(),
            ..EngineConfig::default()
        };
        let client = create_client(&config).unwrap();
        let fetcher = Arc::new(HttpFetcher::new(client, config.max_origin_bytes));
        let cache = CacheStore::new(Arc::new(MemoryStore::new(1 << 20)));
        let durable = DurableStore::new(Arc::new(MemoryStore::new(1 << 20)));
        let engine = IconEngine::new(config, cache.clone(), durable.clone(), fetcher);
        AppState {
            engine,
            purger: Arc::new(PurgeCoordinator::new(cache, durable, None)),
            admin_token: admin_token.map(str::to_owned),
        }
    }

    fn header_map(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn authorization_requires_a_configured_credential() {
        let unconfigured = make_state(None);
        assert!(!authorized(&unconfigured, &header_map(Some("Bearer anything"))));

        let configured = make_state(Some("secret"));
        assert!(authorized(&configured, &header_map(Some("Bearer secret"))));
        assert!(!authorized(&configured, &header_map(Some("Bearer wrong"))));
        assert!(!authorized(&configured, &header_map(None)));
    }

    #[test]
    fn resize_params_come_from_the_query_map() {
        let mut params = HashMap::new();
        params.insert("w".to_string(), "64".to_string());
        params.insert("fit".to_string(), "cover".to_string());
        let resize = resize_params(&params);
        assert_eq!(resize.width, Some(64));
        assert_eq!(resize.fit, imgpipe::FitMode::Cover);
    }

    #[test]
    fn response_headers_carry_both_cache_controls() {
        let response = plain(StatusCode::NOT_FOUND, "NOT FOUND", CachePolicy::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=14400"
        );
        assert_eq!(
            response.headers().get(&CDN_CACHE_CONTROL).unwrap(),
            "public, max-age=14400"
        );
    }
}
