//! Entity tags and `If-None-Match` evaluation.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a response body.
pub fn content_etag(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// The weak validator form emitted in the `ETag` header: `W/"<digest>"`.
pub fn weak_etag(digest: &str) -> String {
    format!("W/\"{digest}\"")
}

fn strong_etag(digest: &str) -> String {
    format!("\"{digest}\"")
}

/// Returns true when any validator listed in an `If-None-Match` header names
/// `digest`, in either its quoted or weak-prefixed form.
pub fn if_none_match_matches(header: &str, digest: &str) -> bool {
    if header.is_empty() {
        return false;
    }

    let weak = weak_etag(digest);
    let strong = strong_etag(digest);
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == weak || candidate == strong)
}
