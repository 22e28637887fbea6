//! SHA-256 content hashes used as the image cache's dedup key

use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 digest of an image's raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute the SHA-256 hash of the given data.
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Return the hash as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, used to disambiguate file names.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            ContentHash::compute(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_different_data_differs() {
        assert_ne!(ContentHash::compute(b"hello"), ContentHash::compute(b"world"));
    }

    #[test]
    fn test_short_hex_is_prefix() {
        let hash = ContentHash::compute(b"galaxy");
        assert_eq!(hash.short_hex().len(), 8);
        assert!(hash.to_hex().starts_with(&hash.short_hex()));
        assert_eq!(format!("{hash}"), hash.to_hex());
    }
}
