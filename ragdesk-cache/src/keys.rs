//! Cache key derivation
//!
//! Embedding and response tiers are content-addressed: the key is a hash of
//! the input text, so arbitrarily long prompts map to short fixed-size keys.
//! Handle and general tiers use readable namespaced names.

use crate::types::CacheKey;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hex digest of `text`, stable for the lifetime of the process
pub fn content_key(text: &str) -> CacheKey {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// `namespace:key`, or just `key` when the namespace is empty
pub fn namespaced_key(namespace: &str, key: &str) -> CacheKey {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", namespace, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_deterministic() {
        assert_eq!(content_key("what are the fees?"), content_key("what are the fees?"));
        assert_ne!(content_key("what are the fees?"), content_key("what are the fees"));
        assert_eq!(content_key("x").len(), 16);
    }

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key("retrieval", "faq:pix"), "retrieval:faq:pix");
        assert_eq!(namespaced_key("", "raw"), "raw");
    }
}
