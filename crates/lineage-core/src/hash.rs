//! Stable hashing helpers for content addressing and document digests.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes =
        serde_json::to_vec(v).map_err(|e| crate::error::Error::Document(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// Content hash of a directory-like collection, derived from its members.
///
/// Members are sorted by path first, so listing order does not matter.
pub fn collection_hash<'a, I>(members: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = members.into_iter().collect();
    pairs.sort_unstable();
    let mut h = Hasher::new();
    for (path, checksum) in pairs {
        h.update(path.as_bytes());
        h.update(&[0]);
        h.update(checksum.as_bytes());
        h.update(&[b'\n']);
    }
    h.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_hash_ignores_member_order() {
        let a = collection_hash([("d/a", "1"), ("d/b", "2")]);
        let b = collection_hash([("d/b", "2"), ("d/a", "1")]);
        assert_eq!(a, b);
        assert_ne!(a, collection_hash([("d/a", "1"), ("d/b", "3")]));
    }

    #[test]
    fn hex_is_64_chars() {
        assert_eq!(hash_str("lineage").to_hex().len(), 64);
    }
}
