//! Fixed archive header: magic, version, flags, file count.
//!
//! ```text
//! offset  size  field
//! 0       5     magic "plank"
//! 5       1     version
//! 6       1     flags (bit0 compressed, bit1 encrypted, bit2 verifiable)
//! 7       4     file_count (u32 LE)
//! ```

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::error::{PlankError, Result};

pub const MAGIC: &[u8; 5] = b"plank";
pub const VERSION: u8 = 1;
pub const HEADER_SIZE: usize = MAGIC.len() + 1 + 1 + 4;

pub const FLAG_COMPRESSED: u8 = 1 << 0;
pub const FLAG_ENCRYPTED:  u8 = 1 << 1;
pub const FLAG_VERIFIABLE: u8 = 1 << 2;
const FLAG_KNOWN: u8 = FLAG_COMPRESSED | FLAG_ENCRYPTED | FLAG_VERIFIABLE;

// ── Flags ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "FlagsView")]
pub struct Flags(u8);

impl Flags {
    pub fn new(compressed: bool, encrypted: bool, verifiable: bool) -> Self {
        let mut bits = 0;
        if compressed { bits |= FLAG_COMPRESSED; }
        if encrypted  { bits |= FLAG_ENCRYPTED; }
        if verifiable { bits |= FLAG_VERIFIABLE; }
        Flags(bits)
    }

    /// Reject bits this version does not define.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !FLAG_KNOWN != 0 {
            return Err(PlankError::FormatMismatch);
        }
        Ok(Flags(bits))
    }

    pub fn bits(self) -> u8 { self.0 }
    pub fn compressed(self) -> bool { self.0 & FLAG_COMPRESSED != 0 }
    pub fn encrypted(self)  -> bool { self.0 & FLAG_ENCRYPTED  != 0 }
    pub fn verifiable(self) -> bool { self.0 & FLAG_VERIFIABLE != 0 }
}

#[derive(Serialize)]
struct FlagsView {
    compressed: bool,
    encrypted:  bool,
    verifiable: bool,
}

impl From<Flags> for FlagsView {
    fn from(f: Flags) -> Self {
        FlagsView { compressed: f.compressed(), encrypted: f.encrypted(), verifiable: f.verifiable() }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version:    u8,
    pub flags:      Flags,
    pub file_count: u32,
}

impl Header {
    pub fn new(flags: Flags, file_count: u32) -> Self {
        Self { version: VERSION, flags, file_count }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.flags.bits())?;
        writer.write_u32::<LittleEndian>(self.file_count)?;
        Ok(())
    }

    /// Parse the header from the front of `bytes`.
    ///
    /// The magic is compared before anything else is looked at; input that
    /// does not start with it is a [`PlankError::FormatMismatch`] no matter
    /// how short it is.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(PlankError::FormatMismatch);
        }
        if bytes.len() < HEADER_SIZE {
            return Err(PlankError::ManifestCorrupt(format!(
                "header truncated: {} of {HEADER_SIZE} bytes",
                bytes.len()
            )));
        }
        let mut reader = &bytes[MAGIC.len()..HEADER_SIZE];
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(PlankError::UnsupportedVersion(version));
        }
        let flags = Flags::from_bits(reader.read_u8()?)?;
        let file_count = reader.read_u32::<LittleEndian>()?;
        Ok(Self { version, flags, file_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(h: &Header) -> Vec<u8> {
        let mut buf = Vec::new();
        h.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn layout_is_byte_exact() {
        let buf = encoded(&Header::new(Flags::new(true, false, true), 2));
        assert_eq!(buf, [b'p', b'l', b'a', b'n', b'k', 1, 0b101, 2, 0, 0, 0]);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(Header::read(&buf).unwrap().file_count, 2);
    }

    #[test]
    fn bad_magic_rejected_first() {
        assert!(matches!(Header::read(b"plonk\x01\x00\x00\x00\x00\x00"), Err(PlankError::FormatMismatch)));
        assert!(matches!(Header::read(b"pla"), Err(PlankError::FormatMismatch)));
        assert!(matches!(Header::read(b""), Err(PlankError::FormatMismatch)));
    }

    #[test]
    fn short_header_after_magic_is_corrupt() {
        assert!(matches!(Header::read(b"plank\x01"), Err(PlankError::ManifestCorrupt(_))));
    }

    #[test]
    fn version_and_flag_checks() {
        let mut buf = encoded(&Header::new(Flags::default(), 0));
        buf[5] = 9;
        assert!(matches!(Header::read(&buf), Err(PlankError::UnsupportedVersion(9))));

        let mut buf = encoded(&Header::new(Flags::default(), 0));
        buf[6] = 0x80;
        assert!(matches!(Header::read(&buf), Err(PlankError::FormatMismatch)));
    }

    #[test]
    fn flag_bits() {
        let f = Flags::new(false, true, false);
        assert_eq!(f.bits(), FLAG_ENCRYPTED);
        assert!(f.encrypted() && !f.compressed() && !f.verifiable());
    }
}
