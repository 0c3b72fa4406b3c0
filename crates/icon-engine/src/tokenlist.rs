//! # Token List Compilation
//!
//! Aggregates multiple upstream token-list sources into one lookup table
//! keyed by (chainId, address) → image URL. Sources are fetched
//! concurrently; a source's failure never aborts the compilation — it
//! simply contributes nothing. Merging is first-writer-wins in source
//! precedence order, so the output is deterministic for identical upstream
//! responses regardless of fetch completion order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fetch::OriginFetcher;

/// chainId → (lowercased address → image URL).
pub type TokenListTable = HashMap<u64, HashMap<String, String>>;

/// The compiled table, shaped so its JSON form is `{"tokens": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenList {
    pub tokens: TokenListTable,
}

impl TokenList {
    pub fn lookup(&self, chain_id: u64, address: &str) -> Option<&str> {
        self.tokens
            .get(&chain_id)
            .and_then(|chain| chain.get(&address.to_lowercase()))
            .map(String::as_str)
    }
}

/// Parse strategy for one upstream source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SourceKind {
    /// Standard token list: `{"tokens": [{address, chainId, logoURI}]}`.
    /// `relative_logo_base` rewrites non-absolute logo paths.
    TokenList { relative_logo_base: Option<String> },
    /// Bare array of `{address, chainId, logoURI}` entries.
    TokenArray,
    /// Flat `{address: {logoURI, ...}}` map for a single chain.
    ChainMap { chain_id: u64 },
    /// Aggregate entries carrying `{name, logoURI, platforms: {slug:
    /// address}}`; platform slugs map to chain ids and names feed the
    /// chainId-0 table.
    PlatformAggregate,
}

/// One upstream source in precedence order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSource {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

impl ListSource {
    pub fn new(name: &str, url: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            kind,
        }
    }
}

/// The production source set, highest precedence first.
pub fn default_sources() -> Vec<ListSource> {
    let mut sources = vec![
        ListSource::new(
            "uniswap",
            "https://tokens.uniswap.org/",
            SourceKind::TokenList {
                relative_logo_base: None,
            },
        ),
        ListSource::new(
            "sushi",
            "https://token-list.sushi.com/",
            SourceKind::TokenList {
                relative_logo_base: Some(
                    "https://raw.githubusercontent.com/sushiswap/list/master/logos/token-logos/token/"
                        .to_owned(),
                ),
            },
        ),
        ListSource::new(
            "own",
            "https://raw.githubusercontent.com/0xngmi/tokenlists/master/canto.json",
            SourceKind::TokenArray,
        ),
    ];

    for (chain, chain_id) in ONEINCH_CHAINS {
        sources.push(ListSource::new(
            &format!("1inch-{chain}"),
            &format!("https://tokens.1inch.io/v1.1/{chain_id}"),
            SourceKind::ChainMap {
                chain_id: *chain_id,
            },
        ));
    }

    sources.push(ListSource::new(
        "gecko",
        "https://defillama-datasets.llama.fi/tokenlist/all.json",
        SourceKind::PlatformAggregate,
    ));

    sources
}

const ONEINCH_CHAINS: &[(&str, u64)] = &[
    ("ethereum", 1),
    ("bsc", 56),
    ("polygon", 137),
    ("optimism", 10),
    ("arbitrum", 42161),
    ("avax", 43114),
    ("gnosis", 100),
    ("fantom", 250),
    ("klaytn", 8217),
];

/// Platform slug → chain id for aggregate sources.
const PLATFORM_CHAINS: &[(&str, u64)] = &[
    ("ethereum", 1),
    ("binance-smart-chain", 56),
    ("polygon-pos", 137),
    ("optimistic-ethereum", 10),
    ("arbitrum-one", 42161),
    ("avalanche", 43114),
    ("xdai", 100),
    ("fantom", 250),
    ("klay-token", 8217),
    ("aurora", 1313161554),
    ("celo", 42220),
    ("cronos", 25),
    ("dogechain", 2000),
    ("moonriver", 1285),
    ("bittorrent", 199),
    ("oasis", 42262),
    ("velas", 106),
    ("heco", 128),
    ("harmony-shard-0", 1666600000),
    ("boba", 288),
    ("okex-chain", 66),
    ("fuse", 122),
    ("moonbeam", 1284),
];

fn platform_chain_id(slug: &str) -> Option<u64> {
    PLATFORM_CHAINS
        .iter()
        .find(|(name, _)| *name == slug)
        .map(|(_, id)| *id)
}

/// Compiles the token list from its configured sources.
pub struct TokenListCompiler {
    fetcher: Arc<dyn OriginFetcher>,
    sources: Vec<ListSource>,
}

impl TokenListCompiler {
    pub fn new(fetcher: Arc<dyn OriginFetcher>, sources: Vec<ListSource>) -> Self {
        Self { fetcher, sources }
    }

    /// Fetch every source concurrently and merge in precedence order.
    pub async fn compile(&self) -> TokenList {
        let fetches = self
            .sources
            .iter()
            .map(|source| self.fetcher.fetch_json(&source.url));
        let results = future::join_all(fetches).await;

        let mut list = TokenList::default();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(value) => merge_source(&mut list.tokens, source, &value),
                Err(e) => warn!(source = %source.name, error = %e, "token list source failed"),
            }
        }

        debug!(
            chains = list.tokens.len(),
            entries = list.tokens.values().map(HashMap::len).sum::<usize>(),
            "token list compiled"
        );
        list
    }
}

pub(crate) fn merge_source(table: &mut TokenListTable, source: &ListSource, value: &Value) {
    match &source.kind {
        SourceKind::TokenList { relative_logo_base } => {
            let Some(tokens) = value.get("tokens").and_then(Value::as_array) else {
                warn!(source = %source.name, "source payload has no token array");
                return;
            };
            for token in tokens {
                merge_token_entry(table, token, relative_logo_base.as_deref());
            }
        }

        SourceKind::TokenArray => {
            let Some(tokens) = value.as_array() else {
                warn!(source = %source.name, "source payload is not an array");
                return;
            };
            for token in tokens {
                merge_token_entry(table, token, None);
            }
        }

        SourceKind::ChainMap { chain_id } => {
            let Some(tokens) = value.as_object() else {
                warn!(source = %source.name, "source payload is not a map");
                return;
            };
            for token in tokens.values() {
                let Some(address) = token.get("address").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(logo) = token.get("logoURI").and_then(Value::as_str) {
                    admit(table, *chain_id, address, logo);
                }
            }
        }

        SourceKind::PlatformAggregate => {
            let Some(tokens) = value.as_array() else {
                warn!(source = %source.name, "source payload is not an array");
                return;
            };
            for token in tokens {
                let Some(logo) = token.get("logoURI").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(platforms) = token.get("platforms").and_then(Value::as_object) {
                    for (slug, address) in platforms {
                        let (Some(chain_id), Some(address)) =
                            (platform_chain_id(slug), address.as_str())
                        else {
                            continue;
                        };
                        if !address.is_empty() {
                            admit(table, chain_id, address, logo);
                        }
                    }
                }
                // Chain 0 doubles as a name-keyed table for assets with no
                // on-chain address.
                if let Some(name) = token.get("name").and_then(Value::as_str) {
                    admit(table, 0, name, logo);
                }
            }
        }
    }
}

fn merge_token_entry(table: &mut TokenListTable, token: &Value, relative_logo_base: Option<&str>) {
    let (Some(address), Some(chain_id)) = (
        token.get("address").and_then(Value::as_str),
        token.get("chainId").and_then(Value::as_u64),
    ) else {
        return;
    };
    let Some(logo) = token.get("logoURI").and_then(Value::as_str) else {
        return;
    };

    match relative_logo_base {
        Some(base) if !logo.starts_with("https://") => {
            admit(table, chain_id, address, &format!("{base}{logo}"));
        }
        _ => admit(table, chain_id, address, logo),
    }
}

/// First-writer-wins admission; empty and ipfs-hosted logos never enter
/// the table.
fn admit(table: &mut TokenListTable, chain_id: u64, address: &str, logo: &str) {
    if logo.is_empty() || logo.starts_with("ipfs://") {
        return;
    }
    table
        .entry(chain_id)
        .or_default()
        .entry(address.to_lowercase())
        .or_insert_with(|| logo.to_owned());
}
