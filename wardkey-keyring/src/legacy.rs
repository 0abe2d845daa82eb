//! Legacy shared-key strategy.
//!
//! The oldest surveys never had a wrapped content key: everyone with access
//! held one shared key, and storage keeps only a salted digest of it. On a
//! digest match the presented key itself expands into the content key. These
//! records exist solely for surveys created before key wrapping; nothing in
//! this crate creates one for a new survey.

use crate::keyring::StrategyUnlock;
use crate::record::WrappedKeyRecord;
use wardkey_crypto::{
    content_key_from_shared, salted_key_digest, verify_key_digest, Salt, SALT_SIZE,
};

/// Rebuilds a record from stored row values.
pub fn record_from_parts(salt: [u8; SALT_SIZE], key_digest: [u8; 32]) -> WrappedKeyRecord {
    WrappedKeyRecord::LegacyHash { salt, key_digest }
}

/// Builds the record a pre-wrapping survey would have been stored with.
///
/// For backfill tooling and test fixtures only; new surveys never take this
/// path, and the keyring exposes no `enable` for it.
pub fn record_for_existing_shared_key(shared_key: &str) -> WrappedKeyRecord {
    let salt = Salt::random();
    WrappedKeyRecord::LegacyHash {
        salt: *salt.as_bytes(),
        key_digest: salted_key_digest(shared_key, &salt),
    }
}

/// Verifies the presented key against the stored digest; on a match the key
/// expands deterministically into the content key.
pub fn unlock(
    salt: &[u8; SALT_SIZE],
    key_digest: &[u8; 32],
    presented_key: &str,
) -> Option<StrategyUnlock> {
    if !verify_key_digest(presented_key, &Salt::from_bytes(*salt), key_digest) {
        return None;
    }

    let content_key = content_key_from_shared(presented_key);
    Some(StrategyUnlock {
        wrapping_key: content_key.clone(),
        content_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_unlocks_and_expands_deterministically() {
        let record = record_for_existing_shared_key("ward-7-shared-key");
        let WrappedKeyRecord::LegacyHash { salt, key_digest } = &record else {
            panic!("wrong record kind");
        };

        let first = unlock(salt, key_digest, "ward-7-shared-key").unwrap();
        let second = unlock(salt, key_digest, "ward-7-shared-key").unwrap();
        assert_eq!(first.content_key.as_bytes(), second.content_key.as_bytes());
    }

    #[test]
    fn wrong_key_is_none() {
        let record = record_for_existing_shared_key("ward-7-shared-key");
        let WrappedKeyRecord::LegacyHash { salt, key_digest } = &record else {
            panic!("wrong record kind");
        };

        assert!(unlock(salt, key_digest, "ward-8-shared-key").is_none());
    }
}
