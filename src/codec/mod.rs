//! Compression stage.
//!
//! The container knows exactly one compressor: gzip (DEFLATE).  Whether it
//! applies is recorded by the `compressed` header flag, so there is no
//! per-block codec identity on disk; [`CodecId::for_flags`] picks the stage
//! for a whole archive.
//!
//! Stored blocks are complete gzip members.  The gzip trailer carries a
//! CRC-32, so a damaged compressed block normally fails here before the
//! manifest digest is ever consulted.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::header::Flags;

// ── CodecId ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    None,
    Gzip,
}

impl CodecId {
    /// Select the stage an archive with `flags` was written with.
    #[inline]
    pub fn for_flags(flags: Flags) -> Self {
        if flags.compressed() { CodecId::Gzip } else { CodecId::None }
    }

    /// Human-readable name (diagnostics only).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None => "none",
            CodecId::Gzip => "gzip",
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    /// Output would exceed the size the manifest recorded for the block.
    #[error("Decompressed output exceeds {limit} bytes")]
    Oversized { limit: u64 },
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    /// Restore `data`, producing at most `limit` bytes.
    fn decompress(&self, data: &[u8], limit: u64) -> Result<Vec<u8>, CodecError>;
}

/// Identity stage, used when the archive is not compressed.
pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8])   -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
    fn decompress(&self, data: &[u8], _: u64) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

pub struct GzipCodec;
impl Codec for GzipCodec {
    fn codec_id(&self) -> CodecId { CodecId::Gzip }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut w = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::default());
        w.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        w.finish().map_err(|e| CodecError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8], limit: u64) -> Result<Vec<u8>, CodecError> {
        // An empty slice is never a valid gzip member; even compressing
        // nothing produces a header and trailer.
        if data.is_empty() {
            return Err(CodecError::Decompression("empty gzip stream".into()));
        }
        // One byte past the limit is enough to tell an oversized stream apart.
        let mut out = Vec::new();
        GzDecoder::new(data)
            .take(limit.saturating_add(1))
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        if out.len() as u64 > limit {
            return Err(CodecError::Oversized { limit });
        }
        Ok(out)
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::None => Box::new(NoneCodec),
        CodecId::Gzip => Box::new(GzipCodec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(id: CodecId, data: &[u8]) {
        let codec = get_codec(id);
        let packed = codec.compress(data).unwrap();
        assert_eq!(codec.decompress(&packed, data.len() as u64).unwrap(), data);
    }

    #[test]
    fn gzip_roundtrip() {
        roundtrip(CodecId::Gzip, b"Hello, plank! Hello, plank! Hello, plank!");
    }

    #[test]
    fn empty_input_roundtrips() {
        roundtrip(CodecId::Gzip, b"");
        roundtrip(CodecId::None, b"");
    }

    #[test]
    fn gzip_shrinks_repetitive_data() {
        let data = vec![7u8; 64 * 1024];
        let packed = GzipCodec.compress(&data).unwrap();
        assert!(packed.len() < data.len() / 10);
    }

    #[test]
    fn garbage_is_a_decompression_error() {
        let err = GzipCodec.decompress(b"definitely not gzip", 1024).unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
        assert!(matches!(GzipCodec.decompress(b"", 1024), Err(CodecError::Decompression(_))));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let packed = GzipCodec.compress(b"some reasonably sized payload for gzip").unwrap();
        let cut = &packed[..packed.len() - 6];
        assert!(GzipCodec.decompress(cut, 1024).is_err());
    }

    #[test]
    fn inflation_stops_at_limit() {
        let packed = GzipCodec.compress(&vec![0u8; 4 * 1024 * 1024]).unwrap();
        assert!(packed.len() < 64 * 1024);
        assert!(matches!(GzipCodec.decompress(&packed, 1), Err(CodecError::Oversized { limit: 1 })));
        assert_eq!(GzipCodec.decompress(&packed, 4 * 1024 * 1024).unwrap().len(), 4 * 1024 * 1024);
    }

    #[test]
    fn flags_select_stage() {
        assert_eq!(CodecId::for_flags(Flags::new(true, false, false)), CodecId::Gzip);
        assert_eq!(CodecId::for_flags(Flags::new(false, true, true)), CodecId::None);
        assert_eq!(get_codec(CodecId::Gzip).codec_id().name(), "gzip");
    }
}
