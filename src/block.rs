//! Per-file transform pipeline.
//!
//! Encode order is fixed: digest(original) → compress → encrypt.
//! Decode mirrors it: decrypt → decompress → length check → digest compare.
//! A stage whose flag is off is the identity.

use tracing::debug;

use crate::codec::{get_codec, CodecId};
use crate::crypto::{self, KeyMaterial};
use crate::digest::digest;
use crate::error::{PlankError, Result};
use crate::header::Flags;
use crate::manifest::ManifestRecord;

/// One restored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    /// Stored name, or the zero-based position when none was stored.
    pub filename:        String,
    pub bytes:           Vec<u8>,
    /// True only when a digest was recomputed and matched.
    pub digest_verified: bool,
}

/// Transform one file into its manifest record and stored block.
///
/// `key` must be present when `flags.encrypted()`.
pub fn encode_block(
    filename: Option<&str>,
    data:     &[u8],
    flags:    Flags,
    key:      Option<&KeyMaterial>,
) -> Result<(ManifestRecord, Vec<u8>)> {
    let file_digest = flags.verifiable().then(|| digest(data));

    let codec = get_codec(CodecId::for_flags(flags));
    let mut stored = codec.compress(data)?;

    if flags.encrypted() {
        let key = key.ok_or_else(|| PlankError::Key("encryption requested without key material".into()))?;
        stored = crypto::encrypt(key, &stored);
    }

    debug!(
        filename = filename.unwrap_or("<unnamed>"),
        original = data.len(),
        stored = stored.len(),
        codec = codec.codec_id().name(),
        encrypted = flags.encrypted(),
        "encoded block"
    );

    let record = ManifestRecord {
        filename:      filename.filter(|n| !n.is_empty()).map(str::to_owned),
        original_size: data.len() as u64,
        stored_size:   stored.len() as u64,
        digest:        file_digest,
    };
    Ok((record, stored))
}

/// Restore entry `index` from its stored block.
pub fn decode_block(
    index:  usize,
    record: &ManifestRecord,
    stored: &[u8],
    flags:  Flags,
    key:    Option<&KeyMaterial>,
    verify: bool,
) -> Result<DecodedFile> {
    let filename = record.filename.clone().unwrap_or_else(|| index.to_string());

    let decrypted;
    let mut bytes = stored;
    if flags.encrypted() {
        let key = key.ok_or_else(|| PlankError::Key("archive is encrypted but no key was provided".into()))?;
        decrypted = crypto::decrypt(key, stored)?;
        bytes = &decrypted;
    }

    let bytes = get_codec(CodecId::for_flags(flags)).decompress(bytes, record.original_size)?;

    if bytes.len() as u64 != record.original_size {
        return Err(PlankError::ManifestCorrupt(format!(
            "entry {index} ({filename}) restored to {} bytes, manifest says {}",
            bytes.len(),
            record.original_size
        )));
    }

    let mut digest_verified = false;
    if verify {
        if let Some(expected) = record.digest {
            if digest(&bytes) != expected {
                return Err(PlankError::IntegrityMismatch { index, filename });
            }
            digest_verified = true;
        }
    }

    debug!(index, filename = %filename, size = bytes.len(), digest_verified, "decoded block");
    Ok(DecodedFile { filename, bytes, digest_verified })
}
