//! Cache-key canonicalization, durable-store key layout, and TTL
//! alignment.

use std::sync::LazyLock;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use super::types::now_unix;

/// Fixed fast-store key for the compiled token list.
pub const TOKEN_LIST_KEY: &str = "token-list";

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w/]+").expect("static regex"));

/// Derive the canonical cache key for a request path plus query string.
///
/// Percent-escapes are decoded, the result is lowercased, outer slashes
/// are stripped, every run of non-word characters (slash excepted) becomes
/// a single hyphen, and outer hyphens are stripped. Query-parameter order
/// is preserved verbatim: two requests map to the same key only when their
/// raw path and query match after decoding.
///
/// Canonicalization is idempotent.
pub fn canonical_key(path_and_query: &str) -> String {
    let decoded = percent_decode_str(path_and_query).decode_utf8_lossy();
    let lowered = decoded.to_lowercase();
    let trimmed = lowered.trim_matches('/');
    let collapsed = NON_WORD.replace_all(trimmed, "-");
    collapsed.trim_matches(['-', '/']).to_string()
}

/// Derive the canonical key for an absolute URL, ignoring scheme and host.
pub fn key_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut path_and_query = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }
    Some(canonical_key(&path_and_query))
}

/// Durable-store key for a token icon blob.
pub fn token_blob_key(chain_id: u64, address: &str) -> String {
    format!("token/{chain_id}/{}", address.to_lowercase())
}

/// Durable-store key for a collection icon blob.
pub fn collection_blob_key(identifier: &str) -> String {
    format!("collection/{}", identifier.to_lowercase())
}

/// TTL expiring at the next wall-clock boundary that is a multiple of
/// `interval` since the epoch, rather than `interval` after the write.
/// Entries written anywhere inside the same interval expire at the same
/// instant, which keeps cache population self-synchronizing across
/// processes.
pub fn aligned_ttl(interval: Duration) -> Duration {
    Duration::from_secs(aligned_ttl_at(interval.as_secs(), now_unix()))
}

pub(crate) fn aligned_ttl_at(interval_secs: u64, now_unix: u64) -> u64 {
    if interval_secs == 0 {
        return 0;
    }
    interval_secs - (now_unix % interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_is_idempotent() {
        let inputs = [
            "/icons/tokens/1/0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48/?w=64&fit=cover",
            "/Icons/Protocols/Aave%20V3",
            "///weird//---path///",
            "token-list",
        ];
        for input in inputs {
            let once = canonical_key(input);
            assert_eq!(canonical_key(&once), once, "not idempotent for {input}");
        }
    }

    #[test]
    fn canonicalization_preserves_query_order() {
        let a = canonical_key("/icons/x?w=64&h=32");
        let b = canonical_key("/icons/x?h=32&w=64");
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_form_examples() {
        assert_eq!(
            canonical_key("/icons/tokens/1/0xABC/?w=64&fit=cover"),
            "icons/tokens/1/0xabc/-w-64-fit-cover"
        );
        assert_eq!(canonical_key("/Icons/Protocols/Aave%20V3"), "icons/protocols/aave-v3");
    }

    #[test]
    fn key_from_url_ignores_scheme_and_host() {
        let from_url = key_from_url("https://icons.example.com/icons/x?w=64").unwrap();
        assert_eq!(from_url, canonical_key("/icons/x?w=64"));
        assert!(key_from_url("not a url").is_none());
    }

    #[test]
    fn blob_keys_are_lowercased() {
        assert_eq!(token_blob_key(1, "0xABC"), "token/1/0xabc");
        assert_eq!(collection_blob_key("0xDeF"), "collection/0xdef");
    }

    #[test]
    fn aligned_ttl_lands_on_the_same_boundary() {
        // Two computations inside the same hour-of-epoch expire together.
        let now_a = 1_700_000_100;
        let now_b = 1_700_002_800;
        assert_eq!(now_a / 3600, now_b / 3600);
        assert_eq!(
            now_a + aligned_ttl_at(3600, now_a),
            now_b + aligned_ttl_at(3600, now_b),
        );
    }
}
