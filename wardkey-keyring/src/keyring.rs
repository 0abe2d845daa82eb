//! The per-survey keyring: every wrapped copy of one content key.
//!
//! A keyring is a value type, loaded from storage and persisted back after
//! mutation. Strategy presence is record presence; there are no flags.
//! Unlock dispatch is one exhaustive match over the closed secret union, so
//! a new strategy cannot be added without the compiler pointing at every
//! site that must handle it.

use crate::audit::AuditSink;
use crate::error::{KeyringError, KeyringResult};
use crate::escrow::{self, EscrowRequest};
use crate::legacy;
use crate::password::{self, PasswordCredential};
use crate::record::{StrategyKind, WrappedKeyRecord};
use crate::replay::ReplayCredential;
use crate::sso::{self, SsoIdentity};
use tracing::debug;
use uuid::Uuid;
use wardkey_crypto::{CipherKey, KdfParams};

/// What a single strategy hands back on success: the content key plus the
/// wrapping key that freed it (the session vault keeps the latter for cheap
/// replay).
#[derive(Debug)]
pub struct StrategyUnlock {
    pub content_key: CipherKey,
    pub wrapping_key: CipherKey,
}

/// The secret material for one unlock attempt, one variant per strategy.
///
/// Escrow and SSO variants carry material the caller resolved first: the
/// stored identity secret, or the org key recovered through the platform
/// hierarchy.
pub enum UnlockSecret {
    Password(String),
    RecoveryPhrase(String),
    Sso {
        identity: SsoIdentity,
        identity_secret: CipherKey,
    },
    OrgEscrow {
        request: EscrowRequest,
        org_key: CipherKey,
    },
    LegacySharedKey(String),
}

impl UnlockSecret {
    pub fn kind(&self) -> StrategyKind {
        match self {
            UnlockSecret::Password(_) | UnlockSecret::RecoveryPhrase(_) => {
                StrategyKind::PasswordRecovery
            }
            UnlockSecret::Sso { .. } => StrategyKind::Sso,
            UnlockSecret::OrgEscrow { .. } => StrategyKind::OrgEscrow,
            UnlockSecret::LegacySharedKey(_) => StrategyKind::LegacyHash,
        }
    }
}

impl std::fmt::Debug for UnlockSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UnlockSecret::{}(REDACTED)", self.kind())
    }
}

/// A successful unlock: the content key for immediate use, and the replay
/// credential the session vault seals for later requests.
#[derive(Debug)]
pub struct UnlockGrant {
    pub content_key: CipherKey,
    pub replay: ReplayCredential,
}

/// All wrapped-key records for one survey.
#[derive(Debug, Clone)]
pub struct SurveyKeyring {
    survey_id: Uuid,
    records: Vec<WrappedKeyRecord>,
}

impl SurveyKeyring {
    /// An empty keyring for a survey with no encryption configured yet.
    pub fn new(survey_id: Uuid) -> Self {
        Self {
            survey_id,
            records: Vec::new(),
        }
    }

    /// Rebuilds a keyring from stored records. The first record per strategy
    /// wins; storage keys rows by (survey, strategy), so duplicates can only
    /// come from hand-edited rows.
    pub fn from_records(survey_id: Uuid, records: Vec<WrappedKeyRecord>) -> Self {
        let mut keyring = Self::new(survey_id);
        for record in records {
            if !keyring.has_strategy(record.kind()) {
                keyring.records.push(record);
            }
        }
        keyring
    }

    pub fn survey_id(&self) -> Uuid {
        self.survey_id
    }

    pub fn records(&self) -> &[WrappedKeyRecord] {
        &self.records
    }

    /// True iff any strategy is configured (the survey-level `is_encrypted`).
    pub fn is_encrypted(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn has_strategy(&self, kind: StrategyKind) -> bool {
        self.record(kind).is_some()
    }

    pub fn record(&self, kind: StrategyKind) -> Option<&WrappedKeyRecord> {
        self.records.iter().find(|r| r.kind() == kind)
    }

    /// The strategies this survey supports, derived purely from record
    /// presence.
    pub fn configured_strategies(&self) -> Vec<StrategyKind> {
        StrategyKind::all()
            .into_iter()
            .filter(|kind| self.has_strategy(*kind))
            .collect()
    }

    /// Cheap precondition check: would an SSO unlock for this identity even
    /// be attempted? True only for the exact (provider, subject) recorded at
    /// setup.
    pub fn can_auto_unlock(&self, identity: &SsoIdentity) -> bool {
        match self.record(StrategyKind::Sso) {
            Some(WrappedKeyRecord::Sso {
                provider, subject, ..
            }) => provider == &identity.provider && subject == &identity.subject,
            _ => false,
        }
    }

    // ── Setup (fan-out wrapping) ──

    /// Adds the password + recovery-phrase strategy. Returns the phrase to
    /// show the user exactly once.
    pub fn enable_password_recovery(
        &mut self,
        content_key: &CipherKey,
        password: &str,
        params: &KdfParams,
    ) -> KeyringResult<String> {
        self.ensure_absent(StrategyKind::PasswordRecovery)?;
        let (record, phrase) = password::setup(content_key, password, params)?;
        self.records.push(record);
        debug!(survey = %self.survey_id, "password recovery strategy configured");
        Ok(phrase)
    }

    /// Adds the SSO strategy for an identity.
    pub fn enable_sso(
        &mut self,
        content_key: &CipherKey,
        identity: &SsoIdentity,
        identity_secret: &CipherKey,
    ) -> KeyringResult<()> {
        self.ensure_absent(StrategyKind::Sso)?;
        self.records
            .push(sso::setup(content_key, identity, identity_secret)?);
        debug!(survey = %self.survey_id, provider = %identity.provider, "sso strategy configured");
        Ok(())
    }

    /// Adds organization escrow.
    pub fn enable_org_escrow(
        &mut self,
        content_key: &CipherKey,
        org_id: Uuid,
        org_key: &CipherKey,
    ) -> KeyringResult<()> {
        self.ensure_absent(StrategyKind::OrgEscrow)?;
        self.records
            .push(escrow::setup(content_key, org_id, org_key)?);
        debug!(survey = %self.survey_id, org = %org_id, "org escrow strategy configured");
        Ok(())
    }

    fn ensure_absent(&self, kind: StrategyKind) -> KeyringResult<()> {
        if self.has_strategy(kind) {
            return Err(KeyringError::StrategyExists(kind));
        }
        Ok(())
    }

    // ── Unlock ──

    /// Attempts one unlock.
    ///
    /// `Ok(None)` covers every wrong credential (wrong password or phrase,
    /// mismatched identity, failed digest, failed unwrap) and a strategy
    /// that simply is not configured. Escrow gate refusals are authorization
    /// failures, not bad credentials, and surface as typed, audited errors.
    pub fn unlock(
        &self,
        secret: &UnlockSecret,
        params: &KdfParams,
        audit: &dyn AuditSink,
    ) -> KeyringResult<Option<UnlockGrant>> {
        let grant = match secret {
            UnlockSecret::Password(presented) => {
                let Some(WrappedKeyRecord::PasswordRecovery { password_wrap, .. }) =
                    self.record(StrategyKind::PasswordRecovery)
                else {
                    return Ok(None);
                };
                password::unlock_with_password(password_wrap, presented, params)?.map(
                    |unlocked| UnlockGrant {
                        replay: ReplayCredential::Password {
                            wrapping_key: *unlocked.wrapping_key.as_bytes(),
                        },
                        content_key: unlocked.content_key,
                    },
                )
            }

            UnlockSecret::RecoveryPhrase(presented) => {
                let Some(WrappedKeyRecord::PasswordRecovery { phrase_wrap, .. }) =
                    self.record(StrategyKind::PasswordRecovery)
                else {
                    return Ok(None);
                };
                password::unlock_with_phrase(phrase_wrap, presented, params)?.map(|unlocked| {
                    UnlockGrant {
                        replay: ReplayCredential::RecoveryPhrase {
                            wrapping_key: *unlocked.wrapping_key.as_bytes(),
                        },
                        content_key: unlocked.content_key,
                    }
                })
            }

            UnlockSecret::Sso {
                identity,
                identity_secret,
            } => {
                let Some(WrappedKeyRecord::Sso {
                    provider,
                    subject,
                    wrapped_key,
                }) = self.record(StrategyKind::Sso)
                else {
                    return Ok(None);
                };
                sso::unlock(provider, subject, wrapped_key, identity, identity_secret).map(
                    |unlocked| UnlockGrant {
                        replay: ReplayCredential::Sso {
                            provider: provider.clone(),
                            subject: subject.clone(),
                            wrapping_key: *unlocked.wrapping_key.as_bytes(),
                        },
                        content_key: unlocked.content_key,
                    },
                )
            }

            UnlockSecret::OrgEscrow { request, org_key } => {
                let Some(WrappedKeyRecord::OrgEscrow {
                    org_id,
                    wrapped_key,
                }) = self.record(StrategyKind::OrgEscrow)
                else {
                    return Ok(None);
                };
                escrow::unlock(
                    self.survey_id,
                    *org_id,
                    wrapped_key,
                    request,
                    org_key,
                    audit,
                )?
                .map(|unlocked| UnlockGrant {
                    replay: ReplayCredential::OrgEscrow {
                        org_id: *org_id,
                        wrapping_key: *unlocked.wrapping_key.as_bytes(),
                    },
                    content_key: unlocked.content_key,
                })
            }

            UnlockSecret::LegacySharedKey(presented) => {
                let Some(WrappedKeyRecord::LegacyHash { salt, key_digest }) =
                    self.record(StrategyKind::LegacyHash)
                else {
                    return Ok(None);
                };
                legacy::unlock(salt, key_digest, presented).map(|unlocked| UnlockGrant {
                    replay: ReplayCredential::Legacy {
                        shared_key: presented.clone(),
                    },
                    content_key: unlocked.content_key,
                })
            }
        };

        if grant.is_some() {
            debug!(survey = %self.survey_id, strategy = %secret.kind(), "unlock succeeded");
        }
        Ok(grant)
    }

    // ── Credential management ──

    /// Re-wraps under a new password, verified by the current password or the
    /// recovery phrase. The phrase wrap and hint are untouched.
    pub fn rotate_password(
        &mut self,
        current: PasswordCredential<'_>,
        new_password: &str,
        params: &KdfParams,
    ) -> KeyringResult<()> {
        let record = self
            .record(StrategyKind::PasswordRecovery)
            .ok_or(KeyringError::StrategyMissing(StrategyKind::PasswordRecovery))?;
        let rotated = password::rotate_password(record, current, new_password, params)?;
        self.replace(rotated);
        debug!(survey = %self.survey_id, "password rotated");
        Ok(())
    }

    /// Issues a fresh recovery phrase, verified by the password. The old
    /// phrase stops working; returns the new one to show once.
    pub fn regenerate_phrase(
        &mut self,
        password: &str,
        params: &KdfParams,
    ) -> KeyringResult<String> {
        let record = self
            .record(StrategyKind::PasswordRecovery)
            .ok_or(KeyringError::StrategyMissing(StrategyKind::PasswordRecovery))?;
        let (regenerated, phrase) = password::regenerate_phrase(record, password, params)?;
        self.replace(regenerated);
        debug!(survey = %self.survey_id, "recovery phrase regenerated");
        Ok(phrase)
    }

    /// Moves a legacy survey onto the password strategy.
    ///
    /// 1. Verifies the shared key against the stored digest.
    /// 2. Expands it into the content key (unchanged, so old ciphertexts stay
    ///    readable).
    /// 3. Sets up password + phrase wraps for that key.
    /// 4. Retires the legacy record.
    ///
    /// Returns the recovery phrase from the new setup.
    pub fn migrate_legacy(
        &mut self,
        shared_key: &str,
        password: &str,
        params: &KdfParams,
    ) -> KeyringResult<String> {
        let Some(WrappedKeyRecord::LegacyHash { salt, key_digest }) =
            self.record(StrategyKind::LegacyHash)
        else {
            return Err(KeyringError::StrategyMissing(StrategyKind::LegacyHash));
        };
        self.ensure_absent(StrategyKind::PasswordRecovery)?;

        let unlocked =
            legacy::unlock(salt, key_digest, shared_key).ok_or(KeyringError::InvalidCredential)?;

        let (record, phrase) = password::setup(&unlocked.content_key, password, params)?;
        self.records.push(record);
        self.records
            .retain(|r| r.kind() != StrategyKind::LegacyHash);
        debug!(survey = %self.survey_id, "legacy survey migrated to password recovery");
        Ok(phrase)
    }

    fn replace(&mut self, record: WrappedKeyRecord) {
        let kind = record.kind();
        self.records.retain(|r| r.kind() != kind);
        self.records.push(record);
    }
}
