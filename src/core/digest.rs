//! SHA-256 digests for cache keys and hashed evidence spans

use crate::detection::text::normalize_text;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `value`
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Digest of a text after lower-casing and whitespace collapsing
///
/// Texts that differ only in case or spacing share a key.
///
/// ```
/// use pii_detector::core::digest::text_key;
///
/// assert_eq!(text_key("  Olá   Mundo "), text_key("olá mundo"));
/// assert_eq!(text_key("x").len(), 64);
/// ```
pub fn text_key(text: &str) -> String {
    sha256_hex(&normalize_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_text_key_distinguishes_content() {
        assert_ne!(text_key("pedido um"), text_key("pedido dois"));
    }
}
