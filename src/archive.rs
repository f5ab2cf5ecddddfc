//! Container codec — the primary embedding surface.
//!
//! ```
//! use plank::archive::{decode, encode, DecodeOptions, EncodeOptions};
//! use plank::crypto::KeyMaterial;
//!
//! let key = KeyMaterial::from_password("secret");
//! let opts = EncodeOptions { compress: true, encrypt: true, key: Some(key.clone()), ..Default::default() };
//! let packed = encode(&[b"Hello, world!"], &["readme.txt".to_string()], &opts)?;
//!
//! let out = decode(&packed.bytes, &DecodeOptions { verify: true, key: Some(key) })?;
//! assert_eq!(out.files()[0].filename, "readme.txt");
//! assert_eq!(out.files()[0].bytes, b"Hello, world!");
//! # Ok::<(), plank::PlankError>(())
//! ```
//!
//! An archive is built wholly in memory and serialized once; decoding reads
//! an immutable byte slice and never writes back into it.  Both directions
//! are all-or-nothing.

use serde::Serialize;
use tracing::{debug, warn};

use crate::block::{decode_block, encode_block, DecodedFile};
use crate::crypto::KeyMaterial;
use crate::error::{PlankError, Result};
use crate::header::{Flags, Header, HEADER_SIZE};
use crate::manifest::Manifest;

// ── EncodeOptions ────────────────────────────────────────────────────────────

/// Configuration for [`encode`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub compress:   bool,
    pub encrypt:    bool,
    /// Record a digest of every original file.  On by default.
    pub verifiable: bool,
    /// Cipher key.  When `encrypt` is set and this is `None`, a random key
    /// is generated and returned in [`PackedArchive::generated_key`].
    pub key:        Option<KeyMaterial>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { compress: false, encrypt: false, verifiable: true, key: None }
    }
}

impl EncodeOptions {
    /// Use the hex of a password digest as key material.  An empty string
    /// means no key.
    pub fn with_password_digest_hex(mut self, digest_hex: &str) -> Result<Self> {
        self.key = parse_key_hex(digest_hex)?;
        Ok(self)
    }
}

// ── DecodeOptions ────────────────────────────────────────────────────────────

/// Configuration for [`decode`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Recompute and compare digests when the archive carries them.
    pub verify: bool,
    pub key:    Option<KeyMaterial>,
}

impl DecodeOptions {
    /// Use a hex key.  An empty string means no key.
    pub fn with_key_hex(mut self, key_hex: &str) -> Result<Self> {
        self.key = parse_key_hex(key_hex)?;
        Ok(self)
    }
}

fn parse_key_hex(text: &str) -> Result<Option<KeyMaterial>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(KeyMaterial::from_hex(text)?))
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Output of [`encode`].
#[derive(Debug, Clone)]
pub struct PackedArchive {
    pub bytes:         Vec<u8>,
    /// Set when encryption ran without caller key material.  This is the
    /// only way to decrypt the archive later, so it MUST be shown to the
    /// user.
    pub generated_key: Option<KeyMaterial>,
}

/// Output of [`decode`].
#[derive(Debug, Clone)]
pub struct UnpackedArchive {
    files:          Vec<DecodedFile>,
    has_filenames:  bool,
}

impl UnpackedArchive {
    pub fn files(&self) -> &[DecodedFile] { &self.files }

    /// Restored contents in manifest order.
    pub fn data(&self) -> Vec<&[u8]> {
        self.files.iter().map(|f| f.bytes.as_slice()).collect()
    }

    /// Stored names, or `None` when the archive carries none at all.
    /// Entries without a name fall back to their index.
    pub fn filenames(&self) -> Option<Vec<String>> {
        self.has_filenames
            .then(|| self.files.iter().map(|f| f.filename.clone()).collect())
    }

    /// `(name, bytes)` pairs ready to be written out, one file per pair.
    pub fn into_pairs(self) -> Vec<(String, Vec<u8>)> {
        self.files.into_iter().map(|f| (f.filename, f.bytes)).collect()
    }
}

/// Header and manifest of an archive, without touching the payload contents.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    pub header:       Header,
    pub manifest:     Manifest,
    pub payload_size: u64,
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Pack `files` into a single archive.
///
/// `filenames` is either empty (no names stored) or exactly as long as
/// `files`.
pub fn encode<D: AsRef<[u8]>>(
    files:     &[D],
    filenames: &[String],
    opts:      &EncodeOptions,
) -> Result<PackedArchive> {
    if !filenames.is_empty() && filenames.len() != files.len() {
        return Err(PlankError::Configuration(format!(
            "{} files but {} filenames",
            files.len(),
            filenames.len()
        )));
    }
    let file_count = u32::try_from(files.len())
        .map_err(|_| PlankError::Configuration(format!("too many files: {}", files.len())))?;

    let (key, generated_key) = match (&opts.key, opts.encrypt) {
        (_, false) => {
            if opts.key.is_some() {
                debug!("key material supplied without encryption; ignoring it");
            }
            (None, None)
        }
        (Some(k), true) => {
            debug!(derived = k.is_derived(), "encrypting with supplied key");
            (Some(k.clone()), None)
        }
        (None, true) => {
            let k = KeyMaterial::generate();
            debug!("no key material supplied; generated a random key");
            (Some(k.clone()), Some(k))
        }
    };

    let flags = Flags::new(opts.compress, opts.encrypt, opts.verifiable);
    let mut manifest = Manifest::default();
    let mut payload = Vec::new();

    for (i, data) in files.iter().enumerate() {
        let name = filenames.get(i).map(String::as_str);
        let (record, stored) = encode_block(name, data.as_ref(), flags, key.as_ref())?;
        manifest.records.push(record);
        payload.extend_from_slice(&stored);
    }

    let manifest_len: usize = manifest.records.iter().map(|r| r.encoded_len()).sum();
    let mut bytes = Vec::with_capacity(HEADER_SIZE + manifest_len + payload.len());
    Header::new(flags, file_count).write(&mut bytes)?;
    manifest.write(&mut bytes, flags.verifiable())?;
    bytes.extend_from_slice(&payload);

    debug!(
        files = file_count,
        flags = flags.bits(),
        manifest = manifest_len,
        payload = payload.len(),
        total = bytes.len(),
        "encoded archive"
    );
    Ok(PackedArchive { bytes, generated_key })
}

// ── Decode ───────────────────────────────────────────────────────────────────

/// Parse header and manifest and check that the payload length matches
/// the manifest exactly.  Returns the payload slice alongside.
fn parse(bytes: &[u8]) -> Result<(Header, Manifest, &[u8])> {
    let header = Header::read(bytes)?;
    let mut cursor = &bytes[HEADER_SIZE..];
    let manifest = Manifest::read(&mut cursor, header.file_count, header.flags.verifiable())?;

    let expected = manifest
        .stored_total()
        .ok_or_else(|| PlankError::ManifestCorrupt("stored sizes overflow".into()))?;
    if expected != cursor.len() as u64 {
        return Err(PlankError::ManifestCorrupt(format!(
            "manifest describes {expected} payload bytes, found {}",
            cursor.len()
        )));
    }
    Ok((header, manifest, cursor))
}

/// Read the header and manifest without decrypting or decompressing.
pub fn inspect(bytes: &[u8]) -> Result<ArchiveInfo> {
    let (header, manifest, payload) = parse(bytes)?;
    Ok(ArchiveInfo { header, manifest, payload_size: payload.len() as u64 })
}

/// Restore every file in `bytes`, in manifest order.
pub fn decode(bytes: &[u8], opts: &DecodeOptions) -> Result<UnpackedArchive> {
    let (header, manifest, mut payload) = parse(bytes)?;
    let flags = header.flags;
    debug!(
        version = header.version,
        files = header.file_count,
        compressed = flags.compressed(),
        encrypted = flags.encrypted(),
        verifiable = flags.verifiable(),
        "parsed header"
    );

    if flags.encrypted() {
        let key = opts.key.as_ref()
            .ok_or_else(|| PlankError::Key("archive is encrypted but no key was provided".into()))?;
        debug!(derived = key.is_derived(), "decrypting with supplied key");
    }
    if opts.verify && !flags.verifiable() {
        warn!("verification requested but the archive carries no digests");
    }

    let mut files = Vec::with_capacity(manifest.len());
    for (i, record) in manifest.records.iter().enumerate() {
        // Sizes were checked against the payload length in `parse`.
        let (stored, rest) = payload.split_at(record.stored_size as usize);
        payload = rest;
        files.push(decode_block(i, record, stored, flags, opts.key.as_ref(), opts.verify)?);
    }

    Ok(UnpackedArchive { files, has_filenames: manifest.has_filenames() })
}
