//! Salted one-way digest of the legacy shared key.
//!
//! The oldest surveys predate key wrapping: a single shared key was handed to
//! everyone who needed access, and storage holds only a salted SHA-256 digest
//! of it for verification. On a match, the presented key itself becomes the
//! content key; nothing recoverable is stored.

use crate::key::{domain_digest, CipherKey, Salt};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Domain label for turning a verified shared key into a content key.
const LEGACY_CONTENT_DOMAIN: &str = "wardkey/legacy-content-key/v1";

/// Computes the stored verification digest: SHA-256 over `salt || key`.
pub fn salted_key_digest(shared_key: &str, salt: &Salt) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(shared_key.as_bytes());
    hasher.finalize().into()
}

/// Verifies a presented key against the stored digest in constant time.
pub fn verify_key_digest(shared_key: &str, salt: &Salt, digest: &[u8; 32]) -> bool {
    salted_key_digest(shared_key, salt).ct_eq(digest).into()
}

/// Expands a verified shared key into the 32-byte content key.
///
/// Deterministic by construction: the same shared key always yields the same
/// content key, which is what keeps a decade of old ciphertexts readable.
pub fn content_key_from_shared(shared_key: &str) -> CipherKey {
    CipherKey::from_bytes(domain_digest(LEGACY_CONTENT_DOMAIN, shared_key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_verifies_with_same_salt() {
        let salt = Salt::random();
        let digest = salted_key_digest("team-shared-key-2019", &salt);

        assert!(verify_key_digest("team-shared-key-2019", &salt, &digest));
        assert!(!verify_key_digest("team-shared-key-2020", &salt, &digest));
    }

    #[test]
    fn different_salt_fails_verification() {
        let digest = salted_key_digest("team-shared-key-2019", &Salt::random());
        assert!(!verify_key_digest(
            "team-shared-key-2019",
            &Salt::random(),
            &digest
        ));
    }

    #[test]
    fn shared_key_expands_deterministically() {
        let a = content_key_from_shared("team-shared-key-2019");
        let b = content_key_from_shared("team-shared-key-2019");
        let other = content_key_from_shared("team-shared-key-2020");

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), other.as_bytes());
    }
}
