//! Authenticated encryption for the state file.
//!
//! Keys are URL-safe base64 encodings of 32 random bytes (the same shape as a
//! Fernet key). Blobs use XChaCha20-Poly1305, so a wrong key or any modified
//! byte is detected on decrypt.

use base64::{Engine, engine::general_purpose::URL_SAFE};
#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CalCheckerError, CalCheckerResult};

/// Version tag stored as the first byte of every blob.
pub const VERSION_TAG: u8 = 0x01;

const KEY_LEN: usize = 32;

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
const NONCE_LEN: usize = 24;

/// Poly1305 tag size.
const TAG_LEN: usize = 16;

/// Symmetric key for the state file.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Parse a key from its base64 form, rejecting anything that does not
    /// decode to exactly 32 bytes.
    pub fn parse(encoded: &str) -> CalCheckerResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CalCheckerError::InvalidKey("key is empty".to_string()));
        }

        let mut bytes = URL_SAFE
            .decode(encoded)
            .map_err(|e| CalCheckerError::InvalidKey(format!("not url-safe base64: {e}")))?;

        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(CalCheckerError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {len}"
            )));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(EncryptionKey(key))
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        EncryptionKey(key)
    }

    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    /// Encrypt `plaintext`.
    ///
    /// Blob layout: `[version: 1 byte][nonce: 24 bytes][ciphertext + tag: N + 16 bytes]`.
    #[allow(deprecated)]
    pub fn encrypt(&self, plaintext: &[u8]) -> CalCheckerResult<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new((&self.0).into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CalCheckerError::Cipher(e.to_string()))?;

        let mut result = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        result.push(VERSION_TAG);
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    #[allow(deprecated)]
    pub fn decrypt(&self, blob: &[u8]) -> CalCheckerResult<Vec<u8>> {
        if blob.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CalCheckerError::Cipher("ciphertext too short".to_string()));
        }

        let (version, rest) = blob.split_at(1);
        if version[0] != VERSION_TAG {
            return Err(CalCheckerError::Cipher(format!(
                "unsupported version tag {:#04x}",
                version[0]
            )));
        }

        let (nonce_bytes, ct) = rest.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);
        let cipher = XChaCha20Poly1305::new((&self.0).into());

        // aead::Error carries no detail; wrong key and tampering look the same
        cipher.decrypt(nonce, ct).map_err(|_| {
            CalCheckerError::Cipher("authentication failed (wrong key or corrupted data)".to_string())
        })
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([redacted])")
    }
}

impl std::str::FromStr for EncryptionKey {
    type Err = CalCheckerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EncryptionKey::parse(s)
    }
}
