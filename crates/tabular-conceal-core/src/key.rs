//! Symmetric key generation and persistence
//!
//! A key is 32 random bytes: the first half signs tokens, the second half
//! encrypts them. On disk it is stored as URL-safe base64 text.

use crate::error::{ConcealError, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::path::Path;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
}

impl SecretKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parses the persisted form. Surrounding whitespace is ignored.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| ConcealError::KeyFormat("key file is not valid text".to_string()))?
            .trim();

        let mut decoded = URL_SAFE
            .decode(text)
            .map_err(|e| ConcealError::KeyFormat(format!("key is not valid base64: {}", e)))?;

        if decoded.len() != KEY_LEN {
            let len = decoded.len();
            decoded.zeroize();
            return Err(ConcealError::KeyFormat(format!(
                "expected {} key bytes, found {}",
                KEY_LEN, len
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        URL_SAFE.encode(self.bytes).into_bytes()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            ConcealError::KeyFormat(format!("cannot read {}: {}", path.display(), e))
        })?;
        let key = Self::from_bytes(&raw)?;
        debug!("Loaded key from {}", path.display());
        Ok(key)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes())?;
        debug!("Wrote key to {}", path.as_ref().display());
        Ok(())
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        &self.bytes[..16]
    }

    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.bytes[16..]
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}
