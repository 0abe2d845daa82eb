//! ChaCha20-Poly1305 authenticated encryption.
//!
//! Every ciphertext in the system (wrapped keys, response payloads, session
//! replay bundles) is an [`EncryptedData`]: a fresh random 12-byte nonce plus
//! ciphertext with the Poly1305 tag appended. Decryption with the wrong key or
//! tampered bytes fails on tag verification; it never returns partial output.

use crate::error::{CryptoError, CryptoResult};
use crate::key::CipherKey;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// ChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// A nonce and ciphertext pair.
///
/// The ciphertext includes the Poly1305 tag. Serializes to JSON for
/// structured storage; [`EncryptedData::to_base64`] provides the flat text
/// armor used by older columns (nonce and ciphertext concatenated).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Encodes as base64 over `nonce || ciphertext`.
    pub fn to_base64(&self) -> String {
        let mut combined = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        combined.extend_from_slice(&self.nonce);
        combined.extend_from_slice(&self.ciphertext);
        STANDARD.encode(combined)
    }

    /// Decodes the base64 text armor produced by [`EncryptedData::to_base64`].
    ///
    /// Anything shorter than a nonce plus an authentication tag cannot be a
    /// valid ciphertext and is rejected up front.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let combined = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))?;

        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "ciphertext too short: {} bytes",
                combined.len()
            )));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&combined[..NONCE_SIZE]);

        Ok(Self {
            nonce,
            ciphertext: combined[NONCE_SIZE..].to_vec(),
        })
    }
}

/// Encrypts plaintext under the given key with a fresh random nonce.
pub fn encrypt(key: &CipherKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("ChaCha20-Poly1305 failed: {e}")))?;

    Ok(EncryptedData {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts with tag verification.
///
/// Fails if the key is wrong or any byte of nonce/ciphertext was altered.
pub fn decrypt(key: &CipherKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_ref())
        .map_err(|_| {
            CryptoError::Decryption("authentication failed (wrong key or tampered data)".to_string())
        })
}

/// Encrypts a UTF-8 string.
pub fn encrypt_string(key: &CipherKey, plaintext: &str) -> CryptoResult<EncryptedData> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypts to a UTF-8 string.
pub fn decrypt_string(key: &CipherKey, data: &EncryptedData) -> CryptoResult<String> {
    let plaintext = decrypt(key, data)?;
    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8 in plaintext: {e}")))
}
