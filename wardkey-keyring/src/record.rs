//! Persisted wrapped-key records, one per (survey, strategy).
//!
//! A record is the only evidence that a survey supports a strategy; there is
//! no separate capability flag anywhere. The enum is closed: adding a strategy
//! means adding a variant, and every dispatch site is an exhaustive match the
//! compiler checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardkey_crypto::phrase::PhraseHint;
use wardkey_crypto::{EncryptedData, SALT_SIZE};

/// The four ways a survey's content key can be recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PasswordRecovery,
    Sso,
    OrgEscrow,
    LegacyHash,
}

impl StrategyKind {
    pub fn all() -> [StrategyKind; 4] {
        [
            StrategyKind::PasswordRecovery,
            StrategyKind::Sso,
            StrategyKind::OrgEscrow,
            StrategyKind::LegacyHash,
        ]
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StrategyKind::PasswordRecovery => "password_recovery",
            StrategyKind::Sso => "sso",
            StrategyKind::OrgEscrow => "org_escrow",
            StrategyKind::LegacyHash => "legacy_hash",
        };
        f.write_str(name)
    }
}

/// An Argon2id salt together with the wrap its derived key produced.
///
/// The salt is stored so unlock can re-derive the wrapping key; it is the only
/// derivation input that lives in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaltedWrap {
    pub salt: [u8; SALT_SIZE],
    pub wrapped_key: EncryptedData,
}

/// One wrapped copy of a survey's content key (or, for the legacy scheme, the
/// verification digest that stands in for one).
///
/// Serialized with a `strategy` tag so rows stay self-describing in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy")]
pub enum WrappedKeyRecord {
    /// Two independent wraps from one setup: the password and a 12-word
    /// recovery phrase each wrap the same content key.
    #[serde(rename = "password_recovery")]
    PasswordRecovery {
        password_wrap: SaltedWrap,
        phrase_wrap: SaltedWrap,
        hint: PhraseHint,
    },

    /// Wrapped under a key derived from the stored per-identity secret.
    /// No salt: the identity secret is already high-entropy.
    #[serde(rename = "sso")]
    Sso {
        provider: String,
        subject: String,
        wrapped_key: EncryptedData,
    },

    /// Wrapped under the organization's master key.
    #[serde(rename = "org_escrow")]
    OrgEscrow {
        org_id: Uuid,
        wrapped_key: EncryptedData,
    },

    /// Pre-wrapping surveys: a salted digest of the old shared key, for
    /// verification only. No wrapped key exists.
    #[serde(rename = "legacy_hash")]
    LegacyHash {
        salt: [u8; SALT_SIZE],
        key_digest: [u8; 32],
    },
}

impl WrappedKeyRecord {
    pub fn kind(&self) -> StrategyKind {
        match self {
            WrappedKeyRecord::PasswordRecovery { .. } => StrategyKind::PasswordRecovery,
            WrappedKeyRecord::Sso { .. } => StrategyKind::Sso,
            WrappedKeyRecord::OrgEscrow { .. } => StrategyKind::OrgEscrow,
            WrappedKeyRecord::LegacyHash { .. } => StrategyKind::LegacyHash,
        }
    }
}
