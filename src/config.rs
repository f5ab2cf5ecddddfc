//! Run configuration handed from the CLI to the codec.
//!
//! Built once from parsed arguments and never mutated; the codec only ever
//! sees the [`EncodeOptions`] / [`DecodeOptions`] derived from it.

use std::path::PathBuf;

use tracing::Level;

use crate::archive::{DecodeOptions, EncodeOptions};
use crate::crypto::KeyMaterial;
use crate::digest::password_digest_hex;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub compress:        bool,
    pub encrypt:         bool,
    pub verify:          bool,
    /// Hex SHA-256 of the password, see [`password_digest_hex`].
    pub password_digest: Option<String>,
    /// Hex cipher key.
    pub key:             Option<String>,
    /// Skip recording per-file digests on pack.
    pub no_digests:      bool,
    /// Archive to write on pack, directory to extract into on unpack.
    pub output_path:     Option<PathBuf>,
    pub verbose:         bool,
}

impl Config {
    /// Record `password` in its digest form; the plain text is not kept.
    pub fn with_password(mut self, password: Option<&str>) -> Self {
        self.password_digest = password.filter(|p| !p.is_empty()).map(password_digest_hex);
        self
    }

    /// Key material from the password digest, else the explicit key.
    pub fn key_material(&self) -> Result<Option<KeyMaterial>> {
        let text = self.password_digest.as_deref().or(self.key.as_deref());
        match text {
            Some(t) if !t.trim().is_empty() => Ok(Some(KeyMaterial::from_hex(t)?)),
            _ => Ok(None),
        }
    }

    /// Digests are recorded on pack unless `no_digests` is set; `verify`
    /// only controls whether unpack checks them.
    pub fn encode_options(&self) -> Result<EncodeOptions> {
        Ok(EncodeOptions {
            compress:   self.compress,
            encrypt:    self.encrypt,
            verifiable: !self.no_digests,
            key:        self.key_material()?,
        })
    }

    pub fn decode_options(&self) -> Result<DecodeOptions> {
        Ok(DecodeOptions { verify: self.verify, key: self.key_material()? })
    }

    /// Most verbose level the log subscriber should emit.
    pub fn log_level(&self) -> Level {
        if self.verbose { Level::DEBUG } else { Level::WARN }
    }
}
