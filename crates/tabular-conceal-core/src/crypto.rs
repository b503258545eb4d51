//! Authenticated encryption of scalar values
//!
//! Tokens use the Fernet layout:
//!
//! ```text
//! 0x80 | timestamp (u64 BE) | IV (16) | AES-128-CBC ciphertext | HMAC-SHA256 (32)
//! ```
//!
//! encoded as URL-safe base64. The HMAC covers every byte before it, so a
//! flipped bit or the wrong key is rejected before any decryption happens.

use crate::error::{ConcealError, Result};
use crate::key::SecretKey;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 0x80;
const HEADER_LEN: usize = 1 + 8 + 16;
const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

pub struct Encryptor {
    key: SecretKey,
}

impl Encryptor {
    pub fn new(key: &SecretKey) -> Self {
        Self { key: key.clone() }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; BLOCK_LEN];
        OsRng.fill_bytes(&mut iv);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.encrypt_with(plaintext, timestamp, &iv)
    }

    fn encrypt_with(&self, plaintext: &str, timestamp: u64, iv: &[u8; BLOCK_LEN]) -> Result<String> {
        let cipher = Aes128CbcEnc::new_from_slices(self.key.encryption_key(), iv)
            .map_err(|e| ConcealError::KeyFormat(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = self.mac()?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        Ok(URL_SAFE.encode(token))
    }

    pub fn decrypt(&self, token: &str) -> Result<String> {
        let data = URL_SAFE
            .decode(token.trim())
            .map_err(|_| ConcealError::Decryption("token is not valid base64".to_string()))?;

        if data.len() < HEADER_LEN + BLOCK_LEN + MAC_LEN {
            return Err(ConcealError::Decryption("token too short".to_string()));
        }
        if data[0] != VERSION {
            return Err(ConcealError::Decryption(format!(
                "unsupported token version 0x{:02x}",
                data[0]
            )));
        }

        let (signed, tag) = data.split_at(data.len() - MAC_LEN);
        let mut mac = self.mac()?;
        mac.update(signed);
        mac.verify_slice(tag)
            .map_err(|_| ConcealError::Decryption("authentication failed".to_string()))?;

        let iv = &signed[9..HEADER_LEN];
        let ciphertext = &signed[HEADER_LEN..];
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(ConcealError::Decryption("ciphertext is not block aligned".to_string()));
        }

        let cipher = Aes128CbcDec::new_from_slices(self.key.encryption_key(), iv)
            .map_err(|e| ConcealError::Decryption(e.to_string()))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| ConcealError::Decryption("invalid padding".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| ConcealError::Decryption("plaintext is not UTF-8".to_string()))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.key.signing_key())
            .map_err(|e| ConcealError::KeyFormat(e.to_string()))
    }
}
