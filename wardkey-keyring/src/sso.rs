//! SSO-identity strategy.
//!
//! Provider claims are neither secret nor guaranteed stable, so the wrapping
//! key is never derived from them. Instead a random per-identity secret is
//! generated at first authentication and stored keyed by (provider, subject);
//! the wrapping key is a domain-separated subkey of that secret. Unlock
//! demands an exact (provider, subject) match; two accounts sharing an email
//! address are still two identities.

use crate::error::KeyringResult;
use crate::keyring::StrategyUnlock;
use crate::record::WrappedKeyRecord;
use serde::{Deserialize, Serialize};
use wardkey_crypto::{derive_subkey, unwrap_key, wrap_key, CipherKey, EncryptedData};

const SSO_WRAP_DOMAIN: &str = "wardkey/sso-wrapping-key/v1";

/// An authenticated external identity: the provider and its stable subject
/// identifier, exactly as the identity layer reports them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SsoIdentity {
    pub provider: String,
    pub subject: String,
}

impl SsoIdentity {
    pub fn new(provider: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            subject: subject.into(),
        }
    }
}

/// Derives the wrapping key from the stored per-identity secret.
pub fn wrapping_key_for(identity_secret: &CipherKey) -> CipherKey {
    derive_subkey(SSO_WRAP_DOMAIN, identity_secret.as_bytes())
}

/// Wraps the content key for an identity.
pub fn setup(
    content_key: &CipherKey,
    identity: &SsoIdentity,
    identity_secret: &CipherKey,
) -> KeyringResult<WrappedKeyRecord> {
    let wrapping_key = wrapping_key_for(identity_secret);
    Ok(WrappedKeyRecord::Sso {
        provider: identity.provider.clone(),
        subject: identity.subject.clone(),
        wrapped_key: wrap_key(&wrapping_key, content_key)?,
    })
}

/// Attempts unlock for the authenticated identity.
///
/// `None` unless the identity matches the record exactly and the stored
/// secret's subkey unwraps cleanly.
pub fn unlock(
    provider: &str,
    subject: &str,
    wrapped_key: &EncryptedData,
    identity: &SsoIdentity,
    identity_secret: &CipherKey,
) -> Option<StrategyUnlock> {
    if identity.provider != provider || identity.subject != subject {
        return None;
    }

    let wrapping_key = wrapping_key_for(identity_secret);
    match unwrap_key(&wrapping_key, wrapped_key) {
        Ok(content_key) => Some(StrategyUnlock {
            content_key,
            wrapping_key,
        }),
        Err(_) => None,
    }
}
