//! # Asset Resolution
//!
//! Maps a logical asset identifier to an ordered, finite list of origin
//! candidates. Candidates are evaluated left to right by the engine with a
//! uniform validate-else-continue contract; the resolver itself performs
//! no I/O beyond scanning the bundled asset directory.

mod config;

pub use config::ResolverConfig;

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::cache::{collection_blob_key, token_blob_key};
use crate::tokenlist::TokenListTable;

/// The zero address is a sentinel for "chain's native icon".
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A logical asset identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetIdentifier {
    /// Bundled static asset (protocols, chains, memes, ...).
    Bundled { category: String, name: String },
    /// Token icon addressed by chain and contract address.
    Token { chain_id: u64, address: String },
    /// NFT collection icon addressed by collection identifier.
    Collection { identifier: String },
}

impl AssetIdentifier {
    pub fn bundled(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Bundled {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Token identifier; the address is lowercased so all comparisons are
    /// case-insensitive.
    pub fn token(chain_id: u64, address: &str) -> Self {
        Self::Token {
            chain_id,
            address: address.to_lowercase(),
        }
    }

    pub fn collection(identifier: &str) -> Self {
        Self::Collection {
            identifier: identifier.to_lowercase(),
        }
    }

    /// Durable-store key for the raw origin blob backing this asset, when
    /// the asset kind has one.
    pub fn durable_key(&self) -> Option<String> {
        match self {
            Self::Bundled { .. } => None,
            Self::Token { chain_id, address } => Some(token_blob_key(*chain_id, address)),
            Self::Collection { identifier } => Some(collection_blob_key(identifier)),
        }
    }
}

/// One origin candidate in a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Local packaged asset file.
    LocalAsset(PathBuf),
    /// Previously persisted blob in the durable store.
    StoredBlob(String),
    /// External image URL.
    RemoteUrl(String),
    /// Metadata document whose payload points at the image URL.
    MetadataImage(String),
}

/// Outcome of resolving an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Ordered candidates; an empty list is a terminal not-found.
    Candidates(Vec<Candidate>),
    /// Denylisted asset; not-found before any candidate is attempted.
    Denied,
}

/// Produces candidate chains from identifiers and the configured data
/// tables.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    assets_root: PathBuf,
    config: ResolverConfig,
}

impl AssetResolver {
    pub fn new(assets_root: PathBuf, config: ResolverConfig) -> Self {
        Self {
            assets_root,
            config,
        }
    }

    pub fn category_allowed(&self, category: &str) -> bool {
        self.config.category_allowed(category)
    }

    /// Resolve an identifier into its candidate chain.
    ///
    /// Token resolution is two-phased: without a token list only the
    /// durable blob is a candidate; with one, the remote candidates (list
    /// URL, then the chain's single mapped fallback provider) follow.
    pub fn resolve(&self, id: &AssetIdentifier, tokens: Option<&TokenListTable>) -> Resolution {
        let candidates = match id {
            AssetIdentifier::Bundled { category, name } => {
                if !self.config.category_allowed(category) {
                    trace!(category, "unknown bundled category");
                    return Resolution::Candidates(Vec::new());
                }
                self.local_asset(category, name)
                    .map(Candidate::LocalAsset)
                    .into_iter()
                    .collect()
            }

            AssetIdentifier::Token { chain_id, address } => {
                if self.config.denylist.contains(address) {
                    return Resolution::Denied;
                }

                // Zero address with a mapped chain resolves to the bundled
                // chain-native icon and nothing else.
                if address == ZERO_ADDRESS {
                    if let Some(icon) = self.config.chain_icons.get(chain_id) {
                        return Resolution::Candidates(
                            self.local_asset(&self.config.chain_icon_category, icon)
                                .map(Candidate::LocalAsset)
                                .into_iter()
                                .collect(),
                        );
                    }
                }

                let mut candidates = vec![Candidate::StoredBlob(token_blob_key(*chain_id, address))];
                if let Some(tokens) = tokens {
                    if let Some(url) = tokens.get(chain_id).and_then(|chain| chain.get(address)) {
                        candidates.push(Candidate::RemoteUrl(url.clone()));
                    }
                    if let Some(url) = self.config.fallback_url(*chain_id, address) {
                        candidates.push(Candidate::RemoteUrl(url));
                    }
                }
                candidates
            }

            AssetIdentifier::Collection { identifier } => {
                let mut candidates: Vec<Candidate> = self
                    .local_asset("nfts", identifier)
                    .map(Candidate::LocalAsset)
                    .into_iter()
                    .collect();
                candidates.push(Candidate::StoredBlob(collection_blob_key(identifier)));
                if let Some(url) = self.config.collection_metadata_url(identifier) {
                    candidates.push(Candidate::MetadataImage(url));
                }
                candidates
            }
        };

        Resolution::Candidates(candidates)
    }

    /// Find the packaged asset for `name` in a category directory,
    /// matching case-insensitively and extension-agnostically.
    pub fn local_asset(&self, category: &str, name: &str) -> Option<PathBuf> {
        let directory = self.assets_root.join(category);
        if let Some(path) = scan_directory(&directory, name) {
            return Some(path);
        }
        // Exact file names (extension included) still resolve.
        let direct = directory.join(name);
        direct.is_file().then_some(direct)
    }
}

fn scan_directory(directory: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(directory).ok()?;
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name);
        if stem.eq_ignore_ascii_case(name) {
            return Some(directory.join(file_name));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn local_lookup_is_case_insensitive_and_extension_agnostic() {
        let dir = tempfile::tempdir().unwrap();
        let protocols = dir.path().join("protocols");
        std::fs::create_dir_all(&protocols).unwrap();
        std::fs::write(protocols.join("Aave.png"), b"png").unwrap();
        let resolver = AssetResolver::new(dir.path().to_path_buf(), ResolverConfig::default());

        let found = resolver.local_asset("protocols", "aave").unwrap();
        assert!(found.ends_with("protocols/Aave.png"));
        assert!(resolver.local_asset("protocols", "uniswap").is_none());
    }

    #[test]
    fn denylisted_token_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(dir.path().to_path_buf(), ResolverConfig::default());
        let id = AssetIdentifier::token(1, "0x2E3487f967DF2Ebc2f236E16f8fCAeac7091324D");
        assert_eq!(resolver.resolve(&id, None), Resolution::Denied);
    }

    #[test]
    fn token_candidates_follow_the_contract_order() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(dir.path().to_path_buf(), ResolverConfig::default());
        let id = AssetIdentifier::token(1, "0xAbCd");

        // Without a token list, only the durable blob is a candidate.
        let Resolution::Candidates(first_phase) = resolver.resolve(&id, None) else {
            panic!("expected candidates");
        };
        assert_eq!(
            first_phase,
            vec![Candidate::StoredBlob("token/1/0xabcd".into())]
        );

        // With a list, the list URL precedes the single mapped fallback.
        let mut tokens: TokenListTable = HashMap::new();
        tokens
            .entry(1)
            .or_default()
            .insert("0xabcd".into(), "https://logos.example/a.png".into());
        let Resolution::Candidates(candidates) = resolver.resolve(&id, Some(&tokens)) else {
            panic!("expected candidates");
        };
        assert_eq!(
            candidates,
            vec![
                Candidate::StoredBlob("token/1/0xabcd".into()),
                Candidate::RemoteUrl("https://logos.example/a.png".into()),
                Candidate::RemoteUrl(
                    "https://assets-cdn.trustwallet.com/blockchains/ethereum/assets/0xabcd/logo.png"
                        .into()
                ),
            ]
        );
    }

    #[test]
    fn unmapped_chain_has_no_fallback_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(dir.path().to_path_buf(), ResolverConfig::default());
        let id = AssetIdentifier::token(534352, "0xabcd");
        let tokens: TokenListTable = HashMap::new();

        let Resolution::Candidates(candidates) = resolver.resolve(&id, Some(&tokens)) else {
            panic!("expected candidates");
        };
        assert_eq!(
            candidates,
            vec![Candidate::StoredBlob("token/534352/0xabcd".into())]
        );
    }

    #[test]
    fn zero_address_resolves_to_chain_icon_only() {
        let dir = tempfile::tempdir().unwrap();
        let agg = dir.path().join("agg_icons");
        std::fs::create_dir_all(&agg).unwrap();
        std::fs::write(agg.join("ethereum.png"), b"png").unwrap();
        let resolver = AssetResolver::new(dir.path().to_path_buf(), ResolverConfig::default());

        let id = AssetIdentifier::token(1, ZERO_ADDRESS);
        let Resolution::Candidates(candidates) = resolver.resolve(&id, None) else {
            panic!("expected candidates");
        };
        assert_eq!(candidates.len(), 1);
        assert!(matches!(&candidates[0], Candidate::LocalAsset(p) if p.ends_with("ethereum.png")));
    }

    #[test]
    fn unknown_category_yields_no_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(dir.path().to_path_buf(), ResolverConfig::default());
        let id = AssetIdentifier::bundled("secrets", "anything");
        assert_eq!(resolver.resolve(&id, None), Resolution::Candidates(Vec::new()));
    }
}
