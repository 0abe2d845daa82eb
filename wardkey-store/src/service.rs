//! The survey vault facade: every operation collaborators call, wired to the
//! shared database, the secrets store, and the session vault.
//!
//! Key material never rests here. Reads that need a content key re-derive it
//! through the session vault per request; writes that add or change a
//! strategy run load-check-insert inside one transaction while holding the
//! connection, so two concurrent strategy writes cannot interleave.

use crate::audit_store::{self, DbAuditSink};
use crate::db::{in_transaction, Database};
use crate::error::{StoreError, StoreResult};
use crate::keyring_store;
use crate::response_store;
use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use wardkey_crypto::{generate_random_key, CipherKey, KdfParams, KEY_SIZE};
use wardkey_keyring::org::{provision_org_key, unwrap_org_key};
use wardkey_keyring::{
    legacy, AuditEvent, EscrowRequest, PasswordCredential, PlatformKey, SecretStore, SsoIdentity,
    StrategyKind, SurveyKeyring, UnlockSecret, WrappedKeyRecord,
};
use wardkey_responses::{ResponsePayload, ResponseRecord};
use wardkey_session::SessionKeyVault;

const IDENTITY_SECRET_PREFIX: &str = "wardkey/identity-secret";

fn identity_secret_name(identity: &SsoIdentity) -> String {
    format!(
        "{IDENTITY_SECRET_PREFIX}/{}/{}",
        identity.provider, identity.subject
    )
}

/// One handle per process; clones of [`Database`] and the secrets store are
/// shared, the session vault lives inside.
pub struct SurveyVault {
    db: Database,
    secrets: Arc<dyn SecretStore>,
    sessions: SessionKeyVault,
    kdf: KdfParams,
}

impl SurveyVault {
    pub fn new(db: Database, secrets: Arc<dyn SecretStore>) -> Self {
        Self::with_kdf_params(db, secrets, KdfParams::default())
    }

    pub fn with_kdf_params(db: Database, secrets: Arc<dyn SecretStore>, kdf: KdfParams) -> Self {
        Self {
            db,
            secrets,
            sessions: SessionKeyVault::new(),
            kdf,
        }
    }

    /// Overrides the session TTL; tests use this to force expiry.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionKeyVault::with_ttl(ttl);
        self
    }

    // ── Read-only survey state ──

    pub fn is_encrypted(&self, survey_id: Uuid) -> StoreResult<bool> {
        Ok(self.load_keyring(survey_id)?.is_encrypted())
    }

    pub fn configured_strategies(&self, survey_id: Uuid) -> StoreResult<Vec<StrategyKind>> {
        Ok(self.load_keyring(survey_id)?.configured_strategies())
    }

    pub fn can_auto_unlock(&self, survey_id: Uuid, identity: &SsoIdentity) -> StoreResult<bool> {
        Ok(self.load_keyring(survey_id)?.can_auto_unlock(identity))
    }

    pub fn audit_events(&self, survey_id: Uuid) -> StoreResult<Vec<AuditEvent>> {
        audit_store::events_for_survey(&self.db, survey_id)
    }

    // ── Strategy setup ──

    /// Turns encryption on for a survey: generates the content key and wraps
    /// it under the password strategy. Returns the recovery phrase to show
    /// the owner exactly once.
    pub fn initialize_encryption(&self, survey_id: Uuid, password: &str) -> StoreResult<String> {
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let mut keyring = keyring_store::load_keyring(conn, survey_id)?;
            if keyring.is_encrypted() {
                return Err(StoreError::AlreadyEncrypted(survey_id));
            }

            let content_key = generate_random_key();
            let phrase = keyring.enable_password_recovery(&content_key, password, &self.kdf)?;
            let record = cloned_record(&keyring, StrategyKind::PasswordRecovery)?;
            keyring_store::insert_record(conn, survey_id, &record)?;
            Ok(phrase)
        })
    }

    /// Registers a pre-wrapping survey: stores the salted digest of its
    /// shared key so the legacy strategy can verify it. Backfill only.
    pub fn register_legacy_survey(&self, survey_id: Uuid, shared_key: &str) -> StoreResult<()> {
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let keyring = keyring_store::load_keyring(conn, survey_id)?;
            if keyring.is_encrypted() {
                return Err(StoreError::AlreadyEncrypted(survey_id));
            }
            let record = legacy::record_for_existing_shared_key(shared_key);
            keyring_store::insert_record(conn, survey_id, &record)?;
            Ok(())
        })
    }

    /// Adds the SSO strategy for an identity, creating its stored secret on
    /// first use. The caller must hold an unlocked session for the survey.
    pub fn add_sso_strategy(
        &self,
        survey_id: Uuid,
        session_id: &str,
        identity: &SsoIdentity,
    ) -> StoreResult<()> {
        let identity_secret = self.get_or_create_identity_secret(identity)?;
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let mut keyring = keyring_store::load_keyring(conn, survey_id)?;
            let content_key = self
                .sessions
                .rederive(session_id, survey_id, &keyring)
                .ok_or(StoreError::KeyUnavailable(survey_id))?;

            keyring.enable_sso(&content_key, identity, &identity_secret)?;
            let record = cloned_record(&keyring, StrategyKind::Sso)?;
            keyring_store::insert_record(conn, survey_id, &record)?;
            Ok(())
        })
    }

    /// Adds organization escrow, provisioning the org master key under the
    /// platform key if this is the organization's first escrowed survey.
    pub fn add_org_escrow(
        &self,
        survey_id: Uuid,
        session_id: &str,
        org_id: Uuid,
        platform: &PlatformKey,
    ) -> StoreResult<()> {
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let mut keyring = keyring_store::load_keyring(conn, survey_id)?;
            let content_key = self
                .sessions
                .rederive(session_id, survey_id, &keyring)
                .ok_or(StoreError::KeyUnavailable(survey_id))?;

            let org_key = match keyring_store::load_org_key_record(conn, org_id)? {
                Some(record) => unwrap_org_key(platform, &record)?,
                None => {
                    let (record, key) = provision_org_key(platform, org_id)?;
                    keyring_store::insert_org_key_record(conn, &record)?;
                    key
                }
            };

            keyring.enable_org_escrow(&content_key, org_id, &org_key)?;
            let record = cloned_record(&keyring, StrategyKind::OrgEscrow)?;
            keyring_store::insert_record(conn, survey_id, &record)?;
            Ok(())
        })
    }

    // ── Unlock ──

    /// Attempts one unlock and, on success, seals a replay credential for
    /// the session. `Ok(false)` is the uniform wrong-credential outcome;
    /// escrow gate refusals surface as errors after being audited.
    pub fn unlock(
        &self,
        survey_id: Uuid,
        session_id: &str,
        secret: &UnlockSecret,
    ) -> StoreResult<bool> {
        let keyring = self.load_keyring(survey_id)?;
        let audit = DbAuditSink::new(self.db.clone());
        match keyring.unlock(secret, &self.kdf, &audit)? {
            Some(grant) => {
                self.sessions
                    .remember(session_id, survey_id, &grant.replay)?;
                debug!(survey = %survey_id, strategy = %secret.kind(), "survey unlocked");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Unlock via the stored per-identity secret for an authenticated SSO
    /// identity. An identity with no stored secret is refused uniformly.
    pub fn unlock_with_sso(
        &self,
        survey_id: Uuid,
        session_id: &str,
        identity: &SsoIdentity,
    ) -> StoreResult<bool> {
        let Some(identity_secret) = self.existing_identity_secret(identity)? else {
            return Ok(false);
        };
        self.unlock(
            survey_id,
            session_id,
            &UnlockSecret::Sso {
                identity: identity.clone(),
                identity_secret,
            },
        )
    }

    /// Unlock via organization escrow: resolves the org master key through
    /// the platform hierarchy, then runs the gated, audited escrow path.
    pub fn unlock_with_escrow(
        &self,
        survey_id: Uuid,
        session_id: &str,
        request: EscrowRequest,
        platform: &PlatformKey,
    ) -> StoreResult<bool> {
        let org_id = {
            let keyring = self.load_keyring(survey_id)?;
            match keyring.record(StrategyKind::OrgEscrow) {
                Some(WrappedKeyRecord::OrgEscrow { org_id, .. }) => *org_id,
                _ => return Ok(false),
            }
        };

        let org_key = {
            let conn = self.db.lock()?;
            match keyring_store::load_org_key_record(&conn, org_id)? {
                Some(record) => unwrap_org_key(platform, &record)?,
                None => {
                    warn!(survey = %survey_id, org = %org_id, "escrow record exists but org key is missing");
                    return Ok(false);
                }
            }
        };

        self.unlock(
            survey_id,
            session_id,
            &UnlockSecret::OrgEscrow { request, org_key },
        )
    }

    // ── Credential management ──

    /// Re-wraps under a new password, verified by the current password or
    /// the recovery phrase. Live session bundles for the old password stop
    /// replaying on their next use.
    pub fn rotate_password(
        &self,
        survey_id: Uuid,
        current: PasswordCredential<'_>,
        new_password: &str,
    ) -> StoreResult<()> {
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let mut keyring = keyring_store::load_keyring(conn, survey_id)?;
            keyring.rotate_password(current, new_password, &self.kdf)?;
            let record = cloned_record(&keyring, StrategyKind::PasswordRecovery)?;
            keyring_store::replace_record(conn, survey_id, &record)?;
            Ok(())
        })
    }

    /// Issues a fresh recovery phrase, verified by the password.
    pub fn regenerate_phrase(&self, survey_id: Uuid, password: &str) -> StoreResult<String> {
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let mut keyring = keyring_store::load_keyring(conn, survey_id)?;
            let phrase = keyring.regenerate_phrase(password, &self.kdf)?;
            let record = cloned_record(&keyring, StrategyKind::PasswordRecovery)?;
            keyring_store::replace_record(conn, survey_id, &record)?;
            Ok(phrase)
        })
    }

    /// Moves a legacy survey onto the password strategy, retiring its digest
    /// record in the same transaction. The content key is unchanged, so
    /// every existing ciphertext stays readable.
    pub fn migrate_legacy(
        &self,
        survey_id: Uuid,
        shared_key: &str,
        password: &str,
    ) -> StoreResult<String> {
        let conn = self.db.lock()?;
        in_transaction(&conn, |conn| {
            let mut keyring = keyring_store::load_keyring(conn, survey_id)?;
            let phrase = keyring.migrate_legacy(shared_key, password, &self.kdf)?;
            let record = cloned_record(&keyring, StrategyKind::PasswordRecovery)?;
            keyring_store::insert_record(conn, survey_id, &record)?;
            keyring_store::delete_record(conn, survey_id, StrategyKind::LegacyHash)?;
            Ok(phrase)
        })
    }

    // ── Responses ──

    /// Stores a submission. Encrypted surveys seal answers and demographics
    /// under the session's re-derived key; unencrypted surveys store
    /// plaintext answers but refuse demographics outright.
    pub fn store_response(
        &self,
        survey_id: Uuid,
        session_id: Option<&str>,
        answers: Value,
        demographics: Option<Value>,
    ) -> StoreResult<Uuid> {
        let keyring = self.load_keyring(survey_id)?;

        let record = if keyring.is_encrypted() {
            let session_id = session_id.ok_or(StoreError::KeyUnavailable(survey_id))?;
            let key = self
                .sessions
                .rederive(session_id, survey_id, &keyring)
                .ok_or(StoreError::KeyUnavailable(survey_id))?;
            let mut record = ResponseRecord::new(survey_id);
            record.store_complete_response(&key, &answers, demographics.as_ref())?;
            record
        } else {
            if demographics.is_some() {
                return Err(StoreError::EncryptionNotConfigured(survey_id));
            }
            ResponseRecord::with_plaintext_answers(survey_id, answers)
        };

        let conn = self.db.lock()?;
        response_store::insert_response(&conn, &record)?;
        debug!(survey = %survey_id, response = %record.id, "response stored");
        Ok(record.id)
    }

    /// Loads and opens one submission.
    pub fn load_response(
        &self,
        survey_id: Uuid,
        session_id: Option<&str>,
        response_id: Uuid,
    ) -> StoreResult<ResponsePayload> {
        let keyring = self.load_keyring(survey_id)?;
        let record = {
            let conn = self.db.lock()?;
            response_store::load_response(&conn, survey_id, response_id)?
        };
        self.open_record(&keyring, session_id, &record)
    }

    /// Loads and opens every submission for a survey, oldest first.
    pub fn load_responses(
        &self,
        survey_id: Uuid,
        session_id: Option<&str>,
    ) -> StoreResult<Vec<ResponsePayload>> {
        let keyring = self.load_keyring(survey_id)?;
        let records = {
            let conn = self.db.lock()?;
            response_store::responses_for_survey(&conn, survey_id)?
        };
        records
            .iter()
            .map(|record| self.open_record(&keyring, session_id, record))
            .collect()
    }

    // ── Session lifecycle ──

    /// Drops the sealed credential for one survey in one session.
    pub fn lock_survey(&self, session_id: &str, survey_id: Uuid) {
        self.sessions.clear(session_id, survey_id);
    }

    /// Drops every sealed credential for a session (the logout path).
    pub fn logout(&self, session_id: &str) {
        self.sessions.clear_session(session_id);
    }

    // ── Internals ──

    fn load_keyring(&self, survey_id: Uuid) -> StoreResult<SurveyKeyring> {
        let conn = self.db.lock()?;
        keyring_store::load_keyring(&conn, survey_id)
    }

    fn open_record(
        &self,
        keyring: &SurveyKeyring,
        session_id: Option<&str>,
        record: &ResponseRecord,
    ) -> StoreResult<ResponsePayload> {
        if record.is_encrypted() {
            let session_id = session_id.ok_or(StoreError::KeyUnavailable(record.survey_id))?;
            let key = self
                .sessions
                .rederive(session_id, record.survey_id, keyring)
                .ok_or(StoreError::KeyUnavailable(record.survey_id))?;
            Ok(record.load_complete_response(&key)?)
        } else {
            Ok(record.load_plaintext()?)
        }
    }

    fn existing_identity_secret(&self, identity: &SsoIdentity) -> StoreResult<Option<CipherKey>> {
        match self.secrets.get(&identity_secret_name(identity))? {
            Some(bytes) => {
                let buf: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Storage("stored identity secret has the wrong length".to_string())
                })?;
                Ok(Some(CipherKey::from_bytes(buf)))
            }
            None => Ok(None),
        }
    }

    fn get_or_create_identity_secret(&self, identity: &SsoIdentity) -> StoreResult<CipherKey> {
        if let Some(secret) = self.existing_identity_secret(identity)? {
            return Ok(secret);
        }
        let secret = generate_random_key();
        self.secrets
            .put(&identity_secret_name(identity), secret.as_bytes())?;
        debug!(provider = %identity.provider, "identity secret provisioned");
        Ok(secret)
    }
}

fn cloned_record(keyring: &SurveyKeyring, kind: StrategyKind) -> StoreResult<WrappedKeyRecord> {
    keyring
        .record(kind)
        .cloned()
        .ok_or_else(|| StoreError::Storage(format!("{kind} record missing after update")))
}
