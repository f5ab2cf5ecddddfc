//! SHA-256 digest engine.
//!
//! One hash function serves two purposes: it turns a password into the
//! 32-byte cipher key, and it produces the per-file integrity digests stored
//! in the manifest.  Both uses MUST go through this module so that the
//! encode and decode sides agree byte-for-byte.

use sha2::{Digest, Sha256};

/// Byte length of every digest produced by [`digest`].
pub const DIGEST_LEN: usize = 32;

/// Compute the SHA-256 digest of `data`.
pub fn digest(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// Hex text of `digest(password)`.
///
/// This is the form in which the CLI hands a password to the codec on both
/// the pack and the unpack side.  The codec hex-decodes it back to the raw
/// digest bytes, which become the cipher key.
pub fn password_digest_hex(password: &str) -> String {
    hex::encode(digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn equal_inputs_equal_digests() {
        assert_eq!(digest(b"same"), digest(b"same"));
        assert_ne!(digest(b"same"), digest(b"Same"));
    }

    #[test]
    fn password_hex_round_trips_to_raw_digest() {
        let text = password_digest_hex("secret");
        assert_eq!(text.len(), DIGEST_LEN * 2);
        assert_eq!(hex::decode(&text).unwrap(), digest(b"secret").to_vec());
    }
}
