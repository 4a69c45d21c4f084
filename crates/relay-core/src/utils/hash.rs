//! Digest helpers for npm-style tarball integrity fields.
//!
//! `shasum` is the legacy SHA-1 checksum, `integrity` the subresource
//! integrity string clients prefer.

use base64::{engine::general_purpose, Engine as _};
use sha1::Sha1;
use sha2::{Digest, Sha512};

/// Prefix of SHA-512 subresource integrity strings
pub const SHA512_PREFIX: &str = "sha512-";

/// Uppercase hex SHA-1 of data
pub fn shasum(data: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(data))
}

/// `sha512-<base64>` integrity string of data
pub fn integrity(data: &[u8]) -> String {
    format!(
        "{}{}",
        SHA512_PREFIX,
        general_purpose::STANDARD.encode(Sha512::digest(data))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shasum() {
        // SHA-1("abc")
        assert_eq!(shasum(b"abc"), "A9993E364706816ABA3E25717850C26C9CD0D89D");
    }

    #[test]
    fn test_integrity() {
        let value = integrity(b"abc");
        assert!(value.starts_with(SHA512_PREFIX));

        let encoded = &value[SHA512_PREFIX.len()..];
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded.len(), 64);
        assert_eq!(&decoded[..4], &[0xdd, 0xaf, 0x35, 0xa1]);
    }

    #[test]
    fn test_digests_are_deterministic() {
        assert_eq!(shasum(b"tarball"), shasum(b"tarball"));
        assert_ne!(integrity(b"tarball"), integrity(b"tarball!"));
    }
}
