//! Content fingerprints used to spot repeated posts.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Fingerprint of a post that ignores case, punctuation and spacing.
///
/// Two posts that differ only in formatting (thread markers, emoji, extra
/// blank lines) hash to the same value.
pub fn content_fingerprint(content: &str) -> String {
    let normalized: String = content
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    sha256_hex(normalized.as_bytes())
}
