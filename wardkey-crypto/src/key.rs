//! Key material: the 32-byte cipher key, Argon2id derivation, and
//! domain-separated subkey derivation.
//!
//! Every key in the hierarchy (survey content keys, wrapping keys derived
//! from passwords or phrases, organization master keys) is a [`CipherKey`].
//! The type zeroizes on drop and never prints its bytes.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Cipher key length in bytes (ChaCha20-Poly1305).
pub const KEY_SIZE: usize = 32;

/// Argon2id salt length in bytes.
pub const SALT_SIZE: usize = 16;

/// A 256-bit symmetric key.
///
/// Wraps raw key bytes so they are zeroized on drop and excluded from
/// `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CipherKey(REDACTED)")
    }
}

/// Generates a random 256-bit key from the OS entropy source.
pub fn generate_random_key() -> CipherKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    CipherKey::from_bytes(bytes)
}

/// A random Argon2id salt, stored alongside whatever the derived key wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Argon2id cost parameters.
///
/// Defaults follow the OWASP single-lane recommendation (19 MiB, 2 passes).
/// Derivation is deliberately expensive; tests use [`KdfParams::fast`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use these for real credentials.
    pub fn fast() -> Self {
        Self {
            memory_kib: 64,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Derives a 256-bit key from a secret string using Argon2id.
///
/// The same (secret, salt, params) triple always yields the same key; a
/// fresh random salt per wrap keeps equal secrets from producing equal
/// wrapping keys.
pub fn derive_key(secret: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<CipherKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2 parameters: {e}")))?;

    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = [0u8; KEY_SIZE];
    argon
        .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2 failed: {e}")))?;

    Ok(CipherKey::from_bytes(out))
}

/// SHA-256 of `domain || 0x00 || secret`.
///
/// Used for cheap, deterministic subkey derivation where the input secret is
/// already high-entropy (never for passwords; those go through
/// [`derive_key`]).
pub fn domain_digest(domain: &str, secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update([0u8]);
    hasher.update(secret);
    hasher.finalize().into()
}

/// Derives a subkey from high-entropy secret material under a domain label.
///
/// Distinct domains yield independent keys from the same input, which is how
/// one stored secret (an identity secret, a platform key, a session id) backs
/// several unrelated uses without key reuse.
pub fn derive_subkey(domain: &str, secret: &[u8]) -> CipherKey {
    CipherKey::from_bytes(domain_digest(domain, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = Salt::random();
        let a = derive_key("correct horse", &salt, &KdfParams::fast()).unwrap();
        let b = derive_key("correct horse", &salt, &KdfParams::fast()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salts_give_different_keys() {
        let a = derive_key("same secret", &Salt::random(), &KdfParams::fast()).unwrap();
        let b = derive_key("same secret", &Salt::random(), &KdfParams::fast()).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn domain_separation_yields_independent_subkeys() {
        let secret = generate_random_key();
        let a = derive_subkey("wardkey/test-a", secret.as_bytes());
        let b = derive_subkey("wardkey/test-b", secret.as_bytes());
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn cipher_key_debug_is_redacted() {
        let key = generate_random_key();
        assert_eq!(format!("{key:?}"), "CipherKey(REDACTED)");
    }
}
