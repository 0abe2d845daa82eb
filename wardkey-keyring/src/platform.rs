//! Platform master key: the split-knowledge root of the escrow hierarchy.
//!
//! The 512-bit root is never stored whole. At generation it is split into a
//! vault component (kept in the secrets store) and a custodian component
//! (their XOR), and the custodian component is immediately Shamir-split into
//! k-of-n shares for separate humans before the cleartext copy is wiped.
//! Using the root again means running the ceremony: fetch the vault
//! component and collect threshold shares, then XOR the two components back
//! together.
//!
//! Everything organization escrow protects chains up to this key; no single
//! party (operator or custodian) can rebuild it alone.

use crate::error::{KeyringError, KeyringResult};
use std::collections::HashMap;
use std::sync::RwLock;
use wardkey_crypto::{derive_subkey, shamir, CipherKey, Share};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Platform master key length in bytes (512 bits).
pub const PLATFORM_KEY_SIZE: usize = 64;

/// Default custodian sharing: any 3 of 4 shares reconstruct.
pub const DEFAULT_SHARE_THRESHOLD: u8 = 3;
pub const DEFAULT_SHARE_COUNT: u8 = 4;

/// Secrets-store entry holding the vault component.
const VAULT_COMPONENT_NAME: &str = "wardkey/platform-vault-component";

/// Domain for deriving the 32-byte org-key wrapping key from the 64-byte root.
const ORG_WRAP_DOMAIN: &str = "wardkey/org-key-wrap/v1";

/// The reconstructed 512-bit root. Exists only in memory, only during a
/// ceremony, and zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PlatformKey {
    bytes: [u8; PLATFORM_KEY_SIZE],
}

impl PlatformKey {
    pub fn from_bytes(bytes: [u8; PLATFORM_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; PLATFORM_KEY_SIZE] {
        &self.bytes
    }

    /// The wrapping key organization master keys are sealed under.
    pub fn org_wrapping_key(&self) -> CipherKey {
        derive_subkey(ORG_WRAP_DOMAIN, &self.bytes)
    }
}

impl std::fmt::Debug for PlatformKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlatformKey(REDACTED)")
    }
}

/// Deployment seam for the external secrets backend.
pub trait SecretStore: Send + Sync {
    fn get(&self, name: &str) -> KeyringResult<Option<Vec<u8>>>;
    fn put(&self, name: &str, value: &[u8]) -> KeyringResult<()>;
}

/// In-memory secrets store for tests and local tooling.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> KeyringResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| KeyringError::SecretStore(e.to_string()))?;
        Ok(entries.get(name).cloned())
    }

    fn put(&self, name: &str, value: &[u8]) -> KeyringResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| KeyringError::SecretStore(e.to_string()))?;
        entries.insert(name.to_string(), value.to_vec());
        Ok(())
    }
}

/// The custodian half of a generation ceremony: shares to hand out, and the
/// threshold needed to bring the component back.
pub struct CustodianShares {
    pub threshold: u8,
    pub shares: Vec<Share>,
}

/// Generates the platform master key.
///
/// 1. Draws 512 random bits for the key and 512 for the vault component.
/// 2. Persists the vault component in the secrets store.
/// 3. Shamir-splits the custodian component (`key XOR vault_component`) and
///    wipes the cleartext copy.
///
/// The returned [`PlatformKey`] is the single operational moment the root
/// exists whole outside a ceremony; use it for immediate provisioning and
/// drop it. Everything after that goes through [`reconstruct_platform_key`].
pub fn generate_platform_key(
    store: &dyn SecretStore,
    threshold: u8,
    share_count: u8,
) -> KeyringResult<(PlatformKey, CustodianShares)> {
    use rand::RngCore;

    let mut key_bytes = [0u8; PLATFORM_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key_bytes);

    let mut vault_component = [0u8; PLATFORM_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut vault_component);

    let mut custodian_component = [0u8; PLATFORM_KEY_SIZE];
    for (out, (k, v)) in custodian_component
        .iter_mut()
        .zip(key_bytes.iter().zip(vault_component.iter()))
    {
        *out = k ^ v;
    }

    store.put(VAULT_COMPONENT_NAME, &vault_component)?;
    let shares = shamir::split(&custodian_component, threshold, share_count)?;

    custodian_component.zeroize();
    vault_component.zeroize();

    Ok((
        PlatformKey::from_bytes(key_bytes),
        CustodianShares { threshold, shares },
    ))
}

/// Runs the reconstruction ceremony: vault component plus threshold custodian
/// shares.
pub fn reconstruct_platform_key(
    store: &dyn SecretStore,
    shares: &[Share],
    threshold: u8,
) -> KeyringResult<PlatformKey> {
    let vault_component = store
        .get(VAULT_COMPONENT_NAME)?
        .ok_or(KeyringError::PlatformComponentMissing)?;

    if vault_component.len() != PLATFORM_KEY_SIZE {
        return Err(KeyringError::SecretStore(format!(
            "vault component has {} bytes, expected {PLATFORM_KEY_SIZE}",
            vault_component.len()
        )));
    }

    let mut custodian_component = shamir::combine(shares, threshold)?;
    if custodian_component.len() != PLATFORM_KEY_SIZE {
        custodian_component.zeroize();
        return Err(KeyringError::SecretStore(format!(
            "custodian component has {} bytes, expected {PLATFORM_KEY_SIZE}",
            custodian_component.len()
        )));
    }

    let mut key_bytes = [0u8; PLATFORM_KEY_SIZE];
    for (out, (v, c)) in key_bytes
        .iter_mut()
        .zip(vault_component.iter().zip(custodian_component.iter()))
    {
        *out = v ^ c;
    }

    custodian_component.zeroize();

    Ok(PlatformKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstruction_matches_generated_key() {
        let store = MemorySecretStore::new();
        let (key, custodians) =
            generate_platform_key(&store, DEFAULT_SHARE_THRESHOLD, DEFAULT_SHARE_COUNT).unwrap();

        let rebuilt =
            reconstruct_platform_key(&store, &custodians.shares[..3], custodians.threshold)
                .unwrap();
        assert_eq!(rebuilt.as_bytes(), key.as_bytes());

        // A different share subset reaches the same root.
        let subset = [
            custodians.shares[0].clone(),
            custodians.shares[2].clone(),
            custodians.shares[3].clone(),
        ];
        let rebuilt_again =
            reconstruct_platform_key(&store, &subset, custodians.threshold).unwrap();
        assert_eq!(rebuilt_again.as_bytes(), key.as_bytes());
    }

    #[test]
    fn fewer_than_threshold_shares_fail() {
        let store = MemorySecretStore::new();
        let (_, custodians) = generate_platform_key(&store, 3, 4).unwrap();

        assert!(reconstruct_platform_key(&store, &custodians.shares[..2], 3).is_err());
    }

    #[test]
    fn missing_vault_component_fails() {
        let store = MemorySecretStore::new();
        let (_, custodians) = generate_platform_key(&store, 3, 4).unwrap();

        let empty_store = MemorySecretStore::new();
        let err =
            reconstruct_platform_key(&empty_store, &custodians.shares[..3], 3).unwrap_err();
        assert!(matches!(err, KeyringError::PlatformComponentMissing));
    }

    #[test]
    fn platform_key_debug_is_redacted() {
        let key = PlatformKey::from_bytes([7u8; PLATFORM_KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "PlatformKey(REDACTED)");
    }
}
