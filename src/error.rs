use std::io;
use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;

/// Every way an encode or decode call can fail.
///
/// All variants are terminal for the current call; the codec never returns a
/// partial archive or a partial extraction.
#[derive(Error, Debug)]
pub enum PlankError {
    #[error("Not a .plank archive (magic bytes do not match)")]
    FormatMismatch,
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),
    #[error("Manifest corrupt: {0}")]
    ManifestCorrupt(String),
    #[error("Key error: {0}")]
    Key(String),
    #[error("Decryption failed: {0}")]
    Decryption(String),
    #[error("Compressed stream is corrupt: {0}")]
    CompressionStream(String),
    #[error("Integrity check failed for entry {index} ({filename})")]
    IntegrityMismatch { index: usize, filename: String },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PlankError>;

impl From<CodecError> for PlankError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Compression(msg)   => PlankError::CompressionStream(format!("encode: {msg}")),
            CodecError::Decompression(msg) => PlankError::CompressionStream(msg),
            CodecError::Oversized { limit } => PlankError::ManifestCorrupt(format!(
                "compressed block inflates past its recorded size of {limit} bytes"
            )),
        }
    }
}

impl From<CryptoError> for PlankError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKeyLength { .. } | CryptoError::InvalidHex(_) => {
                PlankError::Key(e.to_string())
            }
            CryptoError::TooShort | CryptoError::WrongKey => PlankError::Decryption(e.to_string()),
        }
    }
}
