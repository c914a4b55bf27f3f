//! Hashing Primitives
//!
//! SHA-256 and HMAC-SHA256 helpers shared by every part of the protocol:
//! - Commitments and proof identifiers
//! - Physics state digests
//! - Keyed sub-hash expansion and signatures
//!
//! All text inputs are hashed as their UTF-8 bytes and all digests are
//! exchanged as lowercase hex.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type Digest32 = [u8; 32];

type HmacSha256 = Hmac<Sha256>;

/// Compute SHA-256 of raw bytes.
pub fn sha256(data: &[u8]) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 of a string and return lowercase hex.
pub fn sha256_hex(data: &str) -> String {
    hex::encode(sha256(data.as_bytes()))
}

/// Compute HMAC-SHA256 with the given key.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Digest32 {
    let mut mac = new_mac(key);
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Compute HMAC-SHA256 over string key and message, returning lowercase hex.
pub fn hmac_sha256_hex(key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(key, data.as_bytes()))
}

/// Check a hex-encoded HMAC tag in constant time.
///
/// Malformed hex is treated as a mismatch.
pub fn verify_hmac_hex(key: &[u8], data: &str, tag_hex: &str) -> bool {
    let Ok(tag) = hex::decode(tag_hex) else {
        return false;
    };
    let mut mac = new_mac(key);
    mac.update(data.as_bytes());
    mac.verify_slice(&tag).is_ok()
}

/// Read the first four bytes of a digest as a big-endian integer.
#[inline]
pub fn leading_u32(digest: &Digest32) -> u32 {
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Case-insensitive comparison of two hex strings.
#[inline]
pub fn hex_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let tag = hmac_sha256_hex(b"Jefe", "what do ya want for nothing?");
        assert_eq!(
            tag,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_hmac_hex() {
        let tag = hmac_sha256_hex(b"key", "message");
        assert!(verify_hmac_hex(b"key", "message", &tag));
        assert!(verify_hmac_hex(b"key", "message", &tag.to_uppercase()));
        assert!(!verify_hmac_hex(b"other", "message", &tag));
        assert!(!verify_hmac_hex(b"key", "message!", &tag));
        assert!(!verify_hmac_hex(b"key", "message", "not-hex"));
        assert!(!verify_hmac_hex(b"key", "message", ""));
    }

    #[test]
    fn test_leading_u32_is_big_endian() {
        let mut digest = [0u8; 32];
        digest[..4].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(leading_u32(&digest), 0x0102_0304);
    }

    #[test]
    fn test_hex_eq() {
        assert!(hex_eq("abcDEF", "ABCdef"));
        assert!(!hex_eq("abc", "abd"));
    }
}
