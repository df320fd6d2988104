//! Symmetric encryption for stored request headers.
//!
//! ChaCha20-Poly1305 with a fixed 32-byte key supplied as 64 hex
//! characters. Ciphertext is rendered as `nonce_hex:ciphertext_hex`, with
//! a fresh random nonce per message.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use crate::types::GatewayError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Encrypts and decrypts opaque strings with one fixed key.
pub struct HeaderCipher {
    cipher: ChaCha20Poly1305,
}

impl HeaderCipher {
    /// Build from a 64-character hex key.
    pub fn from_hex(key_hex: &SecretString) -> Result<Self, GatewayError> {
        let bytes = hex::decode(key_hex.expose_secret().trim())
            .map_err(|_| GatewayError::Malformed("encryption key must be hex".into()))?;
        if bytes.len() != KEY_LEN {
            return Err(GatewayError::Malformed(format!(
                "encryption key must be {KEY_LEN} bytes ({} hex chars), got {}",
                KEY_LEN * 2,
                bytes.len()
            )));
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&bytes)),
        })
    }

    /// Generate a random key, hex encoded.
    pub fn generate_key_hex() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, GatewayError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| GatewayError::Storage("encryption failed".into()))?;
        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    pub fn decrypt(&self, text: &str) -> Result<String, GatewayError> {
        let (nonce_hex, body_hex) = text
            .split_once(':')
            .ok_or_else(|| GatewayError::Storage("ciphertext missing nonce separator".into()))?;
        let nonce = hex::decode(nonce_hex)
            .map_err(|_| GatewayError::Storage("nonce is not hex".into()))?;
        if nonce.len() != NONCE_LEN {
            return Err(GatewayError::Storage("nonce has wrong length".into()));
        }
        let body = hex::decode(body_hex)
            .map_err(|_| GatewayError::Storage("ciphertext is not hex".into()))?;
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), body.as_slice())
            .map_err(|_| GatewayError::Storage("decryption failed (wrong key or corrupt data)".into()))?;
        String::from_utf8(plaintext)
            .map_err(|_| GatewayError::Storage("decrypted data is not UTF-8".into()))
    }
}
