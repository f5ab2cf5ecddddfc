//! AES-256-CTR encryption and key material for .plank archives.
//!
//! Key derivation: SHA-256(password) → 32-byte key (raw digest bytes)
//! Encryption:     AES-256-CTR, random IV prepended to ciphertext
//!
//! Encrypted block layout:
//! [ iv (16 B) | key check (8 B) | ciphertext (same length as input) ]
//!
//! The key check is the first 8 bytes of SHA-256("plank-key-check" || key).
//! It rejects a wrong key up front; it does not authenticate the ciphertext,
//! so a damaged IV or body still decrypts to garbage that only the manifest
//! digest catches.

use aes::Aes256;
use ctr::cipher::generic_array::GenericArray;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::digest::digest;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Byte length of the cipher key.
pub const KEY_LEN: usize = 32;
/// Byte length of the IV prepended to every encrypted block.
pub const IV_LEN: usize = 16;
/// Byte length of the key check value following the IV.
pub const KEY_CHECK_LEN: usize = 8;
/// Fixed bytes an encrypted block adds on top of its plaintext.
pub const OVERHEAD: usize = IV_LEN + KEY_CHECK_LEN;

const KEY_CHECK_TAG: &[u8] = b"plank-key-check";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key must be {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("Key is not valid hex: {0}")]
    InvalidHex(String),
    #[error("Encrypted block too short (minimum {OVERHEAD} bytes)")]
    TooShort,
    #[error("Wrong key: key check value does not match")]
    WrongKey,
}

// ── KeyMaterial ──────────────────────────────────────────────────────────────

/// Resolved symmetric key.
///
/// Both variants hold exactly [`KEY_LEN`] bytes; the distinction records
/// where the key came from, which matters for diagnostics only.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// SHA-256 of a password.
    Derived([u8; KEY_LEN]),
    /// Raw key bytes supplied by the caller or freshly generated.
    Explicit([u8; KEY_LEN]),
}

impl KeyMaterial {
    /// Derive the key for `password`.  Pack and unpack MUST both come
    /// through here (or through the hex of the same digest).
    pub fn from_password(password: &str) -> Self {
        KeyMaterial::Derived(digest(password.as_bytes()))
    }

    /// Decode a hex key, e.g. one printed by a previous `pack`.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes).map(KeyMaterial::Explicit)
    }

    /// Fresh random key for archives encrypted without a password.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        KeyMaterial::Explicit(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        match self {
            KeyMaterial::Derived(k) | KeyMaterial::Explicit(k) => k,
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, KeyMaterial::Derived(_))
    }

    fn from_slice(bytes: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
        bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            got:      bytes.len(),
        })
    }
}

// Never print key bytes through `{:?}`.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::Derived(_)  => f.write_str("KeyMaterial::Derived(..)"),
            KeyMaterial::Explicit(_) => f.write_str("KeyMaterial::Explicit(..)"),
        }
    }
}

// ── Cipher ───────────────────────────────────────────────────────────────────

fn key_check(key: &KeyMaterial) -> [u8; KEY_CHECK_LEN] {
    let full = Sha256::new()
        .chain_update(KEY_CHECK_TAG)
        .chain_update(key.as_bytes())
        .finalize();
    let mut kcv = [0u8; KEY_CHECK_LEN];
    kcv.copy_from_slice(&full[..KEY_CHECK_LEN]);
    kcv
}

/// Encrypt `plaintext` with AES-256-CTR under a random IV.
///
/// Returns `iv (16 B) || key check (8 B) || ciphertext`.
pub fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut cipher = Aes256Ctr::new(GenericArray::from_slice(key.as_bytes()), &iv.into());

    let mut out = Vec::with_capacity(OVERHEAD + plaintext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&key_check(key));
    out.extend_from_slice(plaintext);
    cipher.apply_keystream(&mut out[OVERHEAD..]);
    out
}

/// Decrypt a block produced by [`encrypt`].
///
/// Fails with [`CryptoError::WrongKey`] when `key` is not the key the block
/// was encrypted with.
pub fn decrypt(key: &KeyMaterial, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < OVERHEAD {
        return Err(CryptoError::TooShort);
    }
    let (iv, rest) = data.split_at(IV_LEN);
    let (kcv, body) = rest.split_at(KEY_CHECK_LEN);
    if kcv != key_check(key).as_slice() {
        return Err(CryptoError::WrongKey);
    }
    let mut cipher = Aes256Ctr::new(GenericArray::from_slice(key.as_bytes()), GenericArray::from_slice(iv));
    let mut out = body.to_vec();
    cipher.apply_keystream(&mut out);
    Ok(out)
}
