//! Manifest: one record per packed file, in payload order.
//!
//! ```text
//! filename_len  u32 LE   (0 = no filename)
//! filename      filename_len bytes, UTF-8
//! original_size u64 LE
//! stored_size   u64 LE
//! digest        32 bytes, only when the archive is verifiable
//! ```

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Serialize, Serializer};

use crate::digest::DIGEST_LEN;
use crate::error::{PlankError, Result};

/// Smallest possible encoded record (no filename, no digest).
const MIN_RECORD_SIZE: usize = 4 + 8 + 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestRecord {
    pub filename:      Option<String>,
    pub original_size: u64,
    pub stored_size:   u64,
    #[serde(serialize_with = "digest_as_hex")]
    pub digest:        Option<[u8; DIGEST_LEN]>,
}

fn digest_as_hex<S: Serializer>(d: &Option<[u8; DIGEST_LEN]>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&hex::encode(d)),
        None    => s.serialize_none(),
    }
}

impl ManifestRecord {
    /// Encoded size of this record.
    pub fn encoded_len(&self) -> usize {
        MIN_RECORD_SIZE
            + self.filename.as_ref().map_or(0, |n| n.len())
            + self.digest.map_or(0, |_| DIGEST_LEN)
    }

    /// The digest is written iff `verifiable`; a verifiable archive with a
    /// digest-less record is a programming error and is rejected.
    pub fn write<W: Write>(&self, mut writer: W, verifiable: bool) -> io::Result<()> {
        let name = self.filename.as_deref().unwrap_or("").as_bytes();
        let name_len = u32::try_from(name.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "filename too long"))?;
        writer.write_u32::<LittleEndian>(name_len)?;
        writer.write_all(name)?;
        writer.write_u64::<LittleEndian>(self.original_size)?;
        writer.write_u64::<LittleEndian>(self.stored_size)?;
        if verifiable {
            let digest = self.digest.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "verifiable record without digest")
            })?;
            writer.write_all(&digest)?;
        }
        Ok(())
    }

    /// Read one record from the front of `reader`, advancing it.
    pub fn read(reader: &mut &[u8], verifiable: bool) -> Result<Self> {
        let name_len = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        if name_len > reader.len() {
            return Err(PlankError::ManifestCorrupt(format!(
                "filename length {name_len} exceeds remaining {} bytes",
                reader.len()
            )));
        }
        let (name, rest) = reader.split_at(name_len);
        *reader = rest;
        let filename = if name.is_empty() {
            None
        } else {
            Some(
                std::str::from_utf8(name)
                    .map_err(|e| PlankError::ManifestCorrupt(format!("filename is not UTF-8: {e}")))?
                    .to_owned(),
            )
        };

        let original_size = reader.read_u64::<LittleEndian>().map_err(truncated)?;
        let stored_size = reader.read_u64::<LittleEndian>().map_err(truncated)?;
        let digest = if verifiable {
            let mut d = [0u8; DIGEST_LEN];
            reader.read_exact(&mut d).map_err(truncated)?;
            Some(d)
        } else {
            None
        };

        Ok(Self { filename, original_size, stored_size, digest })
    }
}

fn truncated(_: io::Error) -> PlankError {
    PlankError::ManifestCorrupt("record truncated".into())
}

// ── Manifest ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub records: Vec<ManifestRecord>,
}

impl Manifest {
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Total bytes the payload area must hold.  `None` on overflow.
    pub fn stored_total(&self) -> Option<u64> {
        self.records.iter().try_fold(0u64, |acc, r| acc.checked_add(r.stored_size))
    }

    /// True when at least one record carries a filename.
    pub fn has_filenames(&self) -> bool {
        self.records.iter().any(|r| r.filename.is_some())
    }

    pub fn write<W: Write>(&self, mut writer: W, verifiable: bool) -> io::Result<()> {
        for rec in &self.records {
            rec.write(&mut writer, verifiable)?;
        }
        Ok(())
    }

    /// Read `count` records from the front of `reader`, advancing it past
    /// the manifest so that it is left pointing at the payload.
    pub fn read(reader: &mut &[u8], count: u32, verifiable: bool) -> Result<Self> {
        let count = count as usize;
        // A hostile file_count must not drive the allocation.
        let mut records = Vec::with_capacity(count.min(reader.len() / MIN_RECORD_SIZE));
        for i in 0..count {
            let rec = ManifestRecord::read(reader, verifiable).map_err(|e| match e {
                PlankError::ManifestCorrupt(msg) => {
                    PlankError::ManifestCorrupt(format!("record {i} of {count}: {msg}"))
                }
                other => other,
            })?;
            records.push(rec);
        }
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: Option<&str>, digest: Option<[u8; DIGEST_LEN]>) -> ManifestRecord {
        ManifestRecord {
            filename:      name.map(str::to_owned),
            original_size: 10,
            stored_size:   7,
            digest,
        }
    }

    #[test]
    fn record_layout() {
        let mut buf = Vec::new();
        record(Some("a.txt"), None).write(&mut buf, false).unwrap();
        assert_eq!(&buf[..4], &5u32.to_le_bytes());
        assert_eq!(&buf[4..9], b"a.txt");
        assert_eq!(&buf[9..17], &10u64.to_le_bytes());
        assert_eq!(&buf[17..25], &7u64.to_le_bytes());
        assert_eq!(buf.len(), record(Some("a.txt"), None).encoded_len());
    }

    #[test]
    fn manifest_read_leaves_cursor_at_payload() {
        let m = Manifest {
            records: vec![record(Some("a"), Some([1; DIGEST_LEN])), record(None, Some([2; DIGEST_LEN]))],
        };
        let mut buf = Vec::new();
        m.write(&mut buf, true).unwrap();
        buf.extend_from_slice(b"PAYLOAD");

        let mut cursor = &buf[..];
        let back = Manifest::read(&mut cursor, 2, true).unwrap();
        assert_eq!(back, m);
        assert_eq!(cursor, b"PAYLOAD");
        assert_eq!(back.stored_total(), Some(14));
        assert!(back.has_filenames());
    }

    #[test]
    fn empty_filename_reads_back_as_none() {
        let mut buf = Vec::new();
        record(Some(""), None).write(&mut buf, false).unwrap();
        let rec = ManifestRecord::read(&mut &buf[..], false).unwrap();
        assert_eq!(rec.filename, None);
    }

    #[test]
    fn verifiable_write_requires_digest() {
        assert!(record(Some("x"), None).write(Vec::new(), true).is_err());
    }

    #[test]
    fn truncation_is_manifest_corrupt() {
        let mut buf = Vec::new();
        record(Some("name.bin"), Some([9; DIGEST_LEN])).write(&mut buf, true).unwrap();
        for cut in [0, 3, 6, 15, buf.len() - 1] {
            let err = ManifestRecord::read(&mut &buf[..cut], true).unwrap_err();
            assert!(matches!(err, PlankError::ManifestCorrupt(_)), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn oversized_filename_length_is_rejected() {
        let buf = u32::MAX.to_le_bytes();
        assert!(matches!(ManifestRecord::read(&mut &buf[..], false), Err(PlankError::ManifestCorrupt(_))));
    }

    #[test]
    fn non_utf8_filename_is_manifest_corrupt() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xff, 0xfe]);
        buf.extend_from_slice(&10u64.to_le_bytes());
        buf.extend_from_slice(&7u64.to_le_bytes());
        match ManifestRecord::read(&mut &buf[..], false) {
            Err(PlankError::ManifestCorrupt(msg)) => assert!(msg.contains("UTF-8"), "{msg}"),
            other => panic!("expected ManifestCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn huge_count_does_not_preallocate() {
        let err = Manifest::read(&mut &[0u8; 8][..], u32::MAX, false).unwrap_err();
        assert!(matches!(err, PlankError::ManifestCorrupt(_)));
    }

    #[test]
    fn json_renders_digest_as_hex() {
        let json = serde_json::to_string(&record(Some("a"), Some([0xAB; DIGEST_LEN]))).unwrap();
        assert!(json.contains(&"ab".repeat(DIGEST_LEN)));
    }
}
