pub mod error;
pub mod digest;
pub mod codec;
pub mod crypto;
pub mod header;
pub mod manifest;
pub mod block;
pub mod archive;
pub mod config;

pub use error::{PlankError, Result};
pub use header::{Flags, Header};
pub use manifest::{Manifest, ManifestRecord};
pub use block::DecodedFile;
pub use crypto::KeyMaterial;
pub use archive::{decode, encode, inspect, DecodeOptions, EncodeOptions, PackedArchive, UnpackedArchive};
pub use config::Config;
