//! Replay credentials: what a session vault seals after a successful unlock.
//!
//! A replay credential holds the *wrapping* key that opened the keyring (or,
//! for legacy surveys, the shared key itself); it never holds the content
//! key or a password. Replaying is a straight AEAD unwrap against the current
//! record, so there is no Argon2 work on the request path, and rotating a
//! credential re-wraps the record and silently invalidates every sealed copy
//! of the old wrapping key.

use crate::keyring::SurveyKeyring;
use crate::legacy;
use crate::record::{StrategyKind, WrappedKeyRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkey_crypto::{unwrap_key, CipherKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One sealed unlock, tagged by the strategy that produced it.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReplayCredential {
    Password {
        wrapping_key: [u8; 32],
    },
    RecoveryPhrase {
        wrapping_key: [u8; 32],
    },
    Sso {
        #[zeroize(skip)]
        provider: String,
        #[zeroize(skip)]
        subject: String,
        wrapping_key: [u8; 32],
    },
    OrgEscrow {
        #[zeroize(skip)]
        org_id: Uuid,
        wrapping_key: [u8; 32],
    },
    Legacy {
        shared_key: String,
    },
}

impl ReplayCredential {
    pub fn strategy(&self) -> StrategyKind {
        match self {
            ReplayCredential::Password { .. } | ReplayCredential::RecoveryPhrase { .. } => {
                StrategyKind::PasswordRecovery
            }
            ReplayCredential::Sso { .. } => StrategyKind::Sso,
            ReplayCredential::OrgEscrow { .. } => StrategyKind::OrgEscrow,
            ReplayCredential::Legacy { .. } => StrategyKind::LegacyHash,
        }
    }

    /// Re-opens the content key against the keyring's *current* records.
    ///
    /// `None` whenever the credential no longer fits: the strategy was
    /// removed, the record was re-wrapped by a rotation, or the identity the
    /// credential was minted for no longer matches the record.
    pub fn replay(&self, keyring: &SurveyKeyring) -> Option<CipherKey> {
        match self {
            ReplayCredential::Password { wrapping_key } => {
                let WrappedKeyRecord::PasswordRecovery { password_wrap, .. } =
                    keyring.record(StrategyKind::PasswordRecovery)?
                else {
                    return None;
                };
                unwrap_key(
                    &CipherKey::from_bytes(*wrapping_key),
                    &password_wrap.wrapped_key,
                )
                .ok()
            }

            ReplayCredential::RecoveryPhrase { wrapping_key } => {
                let WrappedKeyRecord::PasswordRecovery { phrase_wrap, .. } =
                    keyring.record(StrategyKind::PasswordRecovery)?
                else {
                    return None;
                };
                unwrap_key(
                    &CipherKey::from_bytes(*wrapping_key),
                    &phrase_wrap.wrapped_key,
                )
                .ok()
            }

            ReplayCredential::Sso {
                provider,
                subject,
                wrapping_key,
            } => {
                let WrappedKeyRecord::Sso {
                    provider: recorded_provider,
                    subject: recorded_subject,
                    wrapped_key,
                } = keyring.record(StrategyKind::Sso)?
                else {
                    return None;
                };
                if recorded_provider != provider || recorded_subject != subject {
                    return None;
                }
                unwrap_key(&CipherKey::from_bytes(*wrapping_key), wrapped_key).ok()
            }

            ReplayCredential::OrgEscrow {
                org_id,
                wrapping_key,
            } => {
                let WrappedKeyRecord::OrgEscrow {
                    org_id: recorded_org,
                    wrapped_key,
                } = keyring.record(StrategyKind::OrgEscrow)?
                else {
                    return None;
                };
                if recorded_org != org_id {
                    return None;
                }
                unwrap_key(&CipherKey::from_bytes(*wrapping_key), wrapped_key).ok()
            }

            ReplayCredential::Legacy { shared_key } => {
                let WrappedKeyRecord::LegacyHash { salt, key_digest } =
                    keyring.record(StrategyKind::LegacyHash)?
                else {
                    return None;
                };
                legacy::unlock(salt, key_digest, shared_key).map(|unlocked| unlocked.content_key)
            }
        }
    }
}

impl std::fmt::Debug for ReplayCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReplayCredential::{}(REDACTED)", self.strategy())
    }
}
