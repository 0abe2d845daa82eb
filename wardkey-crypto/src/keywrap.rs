//! The key-wrap primitive: a content key encrypted under a wrapping key.
//!
//! The same content key is wrapped several times under unrelated wrapping
//! keys (password-derived, phrase-derived, identity-derived, organization).
//! Each wrap carries its own random nonce, so the wraps share no structure
//! an attacker could correlate.

use crate::cipher::{decrypt, encrypt, EncryptedData};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{CipherKey, KEY_SIZE};

/// Wraps a content key under a wrapping key.
pub fn wrap_key(wrapping_key: &CipherKey, content_key: &CipherKey) -> CryptoResult<EncryptedData> {
    encrypt(wrapping_key, content_key.as_bytes())
}

/// Unwraps a content key.
///
/// Fails on tag verification with the wrong wrapping key, and rejects any
/// plaintext that is not exactly one key long; a wrapped blob that decrypts
/// to the wrong size was never a key wrap.
pub fn unwrap_key(wrapping_key: &CipherKey, wrapped: &EncryptedData) -> CryptoResult<CipherKey> {
    let plaintext = decrypt(wrapping_key, wrapped)?;

    if plaintext.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: plaintext.len(),
        });
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&plaintext);
    Ok(CipherKey::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_random_key;

    #[test]
    fn wrap_unwrap_round_trip() {
        let wrapping = generate_random_key();
        let content = generate_random_key();

        let wrapped = wrap_key(&wrapping, &content).unwrap();
        let unwrapped = unwrap_key(&wrapping, &wrapped).unwrap();

        assert_eq!(content.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn unwrap_with_wrong_key_fails() {
        let wrapping = generate_random_key();
        let content = generate_random_key();

        let wrapped = wrap_key(&wrapping, &content).unwrap();
        let err = unwrap_key(&generate_random_key(), &wrapped).unwrap_err();

        assert!(matches!(err, CryptoError::Decryption(_)));
    }

    #[test]
    fn same_key_wrapped_twice_shares_no_bytes() {
        let wrapping = generate_random_key();
        let content = generate_random_key();

        let a = wrap_key(&wrapping, &content).unwrap();
        let b = wrap_key(&wrapping, &content).unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_size_plaintext_rejected() {
        let wrapping = generate_random_key();
        // Encrypt something that is not a 32-byte key under the same wrapping key.
        let not_a_key = crate::cipher::encrypt(&wrapping, b"short").unwrap();

        let err = unwrap_key(&wrapping, &not_a_key).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: 5
            }
        ));
    }
}
