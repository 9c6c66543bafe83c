//! Deterministic content hashing, independent of process identity.
//!
//! Shared by the node estimator (shard-key bucket hashing), the disk
//! cost component (document-id hashing for the LRU simulator), and the
//! LRU preload seed — the same xxh3 crate the teacher uses to
//! fingerprint cache keys (`model/keys.rs`).

use xxhash_rust::xxh3::Xxh3;

/// Stable 64-bit hash over arbitrary bytes.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(bytes);
    hasher.digest()
}

/// Stable hash over a sequence of byte slices, without allocating a
/// combined buffer (used for hashing the sequence of scalar values in
/// a shard key or a document's scalar fields).
pub fn stable_hash_parts<'a, I: IntoIterator<Item = &'a [u8]>>(parts: I) -> u64 {
    let mut hasher = Xxh3::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.digest()
}

#[cfg(test)]
mod hashing_test {
    use super::*;

    #[test]
    fn stable_hash_is_deterministic() {
        assert_eq!(stable_hash(b"hello"), stable_hash(b"hello"));
        assert_ne!(stable_hash(b"hello"), stable_hash(b"world"));
    }

    #[test]
    fn stable_hash_parts_matches_concatenation_when_no_collisions() {
        let a = stable_hash_parts([b"foo".as_ref(), b"bar".as_ref()]);
        let b = stable_hash_parts([b"foo".as_ref(), b"bar".as_ref()]);
        assert_eq!(a, b);
    }
}
