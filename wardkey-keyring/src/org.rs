//! Organization master keys: the second tier of the escrow hierarchy.
//!
//! Each organization holds one master key that escrowed survey keys are
//! wrapped under. The org key itself is stored wrapped under a subkey of the
//! platform root, so recovering it requires the custodian ceremony, exactly
//! as a survey key wrapped under a password requires the password.

use crate::error::KeyringResult;
use crate::platform::PlatformKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkey_crypto::{generate_random_key, unwrap_key, wrap_key, CipherKey, EncryptedData};

/// An organization's master key, wrapped under the platform root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgKeyRecord {
    pub org_id: Uuid,
    pub wrapped_key: EncryptedData,
    pub created_at: DateTime<Utc>,
}

/// Generates and wraps a fresh master key for an organization.
///
/// Returns the record to persist and the unwrapped key for immediate use
/// (setting up escrow on existing surveys); the caller drops the key when
/// provisioning is done.
pub fn provision_org_key(
    platform: &PlatformKey,
    org_id: Uuid,
) -> KeyringResult<(OrgKeyRecord, CipherKey)> {
    let org_key = generate_random_key();
    let record = OrgKeyRecord {
        org_id,
        wrapped_key: wrap_key(&platform.org_wrapping_key(), &org_key)?,
        created_at: Utc::now(),
    };
    Ok((record, org_key))
}

/// Unwraps an organization master key after a reconstruction ceremony.
pub fn unwrap_org_key(platform: &PlatformKey, record: &OrgKeyRecord) -> KeyringResult<CipherKey> {
    Ok(unwrap_key(&platform.org_wrapping_key(), &record.wrapped_key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{generate_platform_key, MemorySecretStore, PLATFORM_KEY_SIZE};

    #[test]
    fn org_key_survives_platform_round_trip() {
        let store = MemorySecretStore::new();
        let (platform, _) = generate_platform_key(&store, 3, 4).unwrap();

        let org_id = Uuid::new_v4();
        let (record, org_key) = provision_org_key(&platform, org_id).unwrap();

        let unwrapped = unwrap_org_key(&platform, &record).unwrap();
        assert_eq!(unwrapped.as_bytes(), org_key.as_bytes());
    }

    #[test]
    fn wrong_platform_key_cannot_unwrap() {
        let store = MemorySecretStore::new();
        let (platform, _) = generate_platform_key(&store, 3, 4).unwrap();
        let (record, _) = provision_org_key(&platform, Uuid::new_v4()).unwrap();

        let other = PlatformKey::from_bytes([9u8; PLATFORM_KEY_SIZE]);
        assert!(unwrap_org_key(&other, &record).is_err());
    }
}
