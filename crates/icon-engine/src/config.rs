//! Engine configuration and HTTP client construction.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::FetchError;
use crate::resolver::ResolverConfig;
use crate::tokenlist::{ListSource, default_sources};

const DEFAULT_USER_AGENT: &str = "iconserv/0.1 (+https://github.com/llamao/iconserv)";

/// Configurable options for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Overall timeout for each origin request.
    pub timeout: Duration,

    /// Connection timeout (time to establish the initial connection).
    pub connect_timeout: Duration,

    /// Whether to follow origin redirects.
    pub follow_redirects: bool,

    /// User agent string for origin requests.
    pub user_agent: String,

    /// Custom HTTP headers for origin requests.
    pub headers: HeaderMap,

    /// Root directory of the bundled asset categories.
    pub assets_root: PathBuf,

    /// Upper bound for a single origin payload.
    pub max_origin_bytes: usize,

    /// Interval the compiled token list is aligned to.
    pub token_list_interval: Duration,

    /// Origin prefix eligible for durable-store logo prefetching.
    pub prefetch_origin: String,

    /// Resolver data tables (chain icons, fallback providers, denylist).
    pub resolver: ResolverConfig,

    /// Upstream token-list sources in precedence order.
    pub sources: Vec<ListSource>,

    /// CDN edge purge endpoint, when one exists.
    pub cdn: Option<CdnConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: EngineConfig::get_default_headers(),
            assets_root: PathBuf::from("assets"),
            max_origin_bytes: 20 * 1024 * 1024,
            token_list_interval: Duration::from_secs(3600),
            prefetch_origin: "https://assets.coingecko.com".to_owned(),
            resolver: ResolverConfig::default(),
            sources: default_sources(),
            cdn: None,
        }
    }
}

impl EngineConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("image/*,application/json;q=0.9,*/*;q=0.8"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers
    }
}

/// CDN edge purge configuration.
#[derive(Debug, Clone)]
pub struct CdnConfig {
    /// Purge endpoint accepting a JSON list of absolute URLs.
    pub endpoint: String,
    /// Bearer credential for the endpoint.
    pub token: String,
}

/// Create a reqwest Client with the provided configuration.
pub fn create_client(config: &EngineConfig) -> Result<Client, FetchError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(FetchError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_client() {
        let config = EngineConfig::default();
        assert!(create_client(&config).is_ok());
    }
}
