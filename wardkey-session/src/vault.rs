//! Forward-secret session credential vault.
//!
//! Per (session, survey) the vault stores one sealed bundle: just enough to
//! replay the unlock strategy that succeeded, encrypted under a key derived
//! from the session identifier itself. The content key is never the stored
//! value, and the session identifier never touches the map either; entries
//! are indexed by a one-way digest of it. A stolen snapshot of vault memory
//! therefore yields neither content keys nor replayable session identifiers.
//!
//! Re-derivation walks the state machine lazily on read: absent, expired,
//! survey mismatch, undecryptable bundle, and dead replay credential all
//! collapse to the same `None`, and every failure discards the entry.

use crate::error::SessionResult;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use wardkey_crypto::{decrypt, derive_subkey, domain_digest, encrypt, CipherKey, EncryptedData};
use wardkey_keyring::{ReplayCredential, SurveyKeyring};
use zeroize::Zeroize;

const SESSION_INDEX_DOMAIN: &str = "wardkey/session-index/v1";
const SESSION_BUNDLE_DOMAIN: &str = "wardkey/session-bundle-key/v1";

/// Sealed credentials outlive their usefulness after half an hour.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// One sealed entry. The representation stays private to this module; the
/// vault's callers only ever see an optional content key.
#[derive(Clone, Serialize, Deserialize)]
struct SessionCredential {
    survey_id: Uuid,
    sealed_bundle: EncryptedData,
    created_at: DateTime<Utc>,
}

/// The bundle plaintext: the survey it was minted for, sealed alongside the
/// credential so a mismatched or spliced entry fails after decryption too.
#[derive(Serialize, Deserialize)]
struct SessionBundle {
    survey_id: Uuid,
    credential: ReplayCredential,
}

fn session_index(session_id: &str) -> [u8; 32] {
    domain_digest(SESSION_INDEX_DOMAIN, session_id.as_bytes())
}

fn bundle_key(session_id: &str) -> CipherKey {
    derive_subkey(SESSION_BUNDLE_DOMAIN, session_id.as_bytes())
}

/// In-memory vault of sealed session credentials.
pub struct SessionKeyVault {
    entries: RwLock<HashMap<([u8; 32], Uuid), SessionCredential>>,
    ttl: Duration,
}

impl Default for SessionKeyVault {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionKeyVault {
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Seals a replay credential for (session, survey), replacing any
    /// previous entry for that slot whole; entries are never edited in
    /// place.
    pub fn remember(
        &self,
        session_id: &str,
        survey_id: Uuid,
        credential: &ReplayCredential,
    ) -> SessionResult<()> {
        let bundle = SessionBundle {
            survey_id,
            credential: credential.clone(),
        };
        let mut bytes = serde_json::to_vec(&bundle)?;
        let sealed_bundle = encrypt(&bundle_key(session_id), &bytes)?;
        bytes.zeroize();

        let record = SessionCredential {
            survey_id,
            sealed_bundle,
            created_at: Utc::now(),
        };
        self.entries
            .write()
            .unwrap()
            .insert((session_index(session_id), survey_id), record);
        debug!(survey = %survey_id, "session credential sealed");
        Ok(())
    }

    /// Attempts to re-derive the content key for (session, survey).
    ///
    /// 1. Looks the slot up by digest; absent is `None`.
    /// 2. Checks the TTL; an expired entry is discarded and behaves exactly
    ///    like absent.
    /// 3. Decrypts the bundle under the session-derived key and re-checks
    ///    the survey sealed inside it.
    /// 4. Replays the credential against the keyring's current records.
    ///
    /// Every failure discards the entry and returns the same `None`; callers
    /// cannot distinguish expired from never-unlocked.
    pub fn rederive(
        &self,
        session_id: &str,
        survey_id: Uuid,
        keyring: &SurveyKeyring,
    ) -> Option<CipherKey> {
        if keyring.survey_id() != survey_id {
            return None;
        }

        let slot = (session_index(session_id), survey_id);
        let mut entries = self.entries.write().unwrap();
        let entry = entries.get(&slot)?.clone();

        if Utc::now() - entry.created_at >= self.ttl {
            entries.remove(&slot);
            return None;
        }

        let Ok(mut bytes) = decrypt(&bundle_key(session_id), &entry.sealed_bundle) else {
            entries.remove(&slot);
            return None;
        };
        let parsed = serde_json::from_slice::<SessionBundle>(&bytes);
        bytes.zeroize();
        let Ok(bundle) = parsed else {
            entries.remove(&slot);
            return None;
        };

        if bundle.survey_id != survey_id {
            entries.remove(&slot);
            return None;
        }

        match bundle.credential.replay(keyring) {
            Some(content_key) => {
                debug!(survey = %survey_id, "session credential replayed");
                Some(content_key)
            }
            // Rotation re-wrapped the record; this bundle is permanently dead.
            None => {
                entries.remove(&slot);
                None
            }
        }
    }

    /// Drops the entry for one (session, survey) slot.
    pub fn clear(&self, session_id: &str, survey_id: Uuid) {
        let slot = (session_index(session_id), survey_id);
        self.entries.write().unwrap().remove(&slot);
    }

    /// Drops every entry for a session (the logout path).
    pub fn clear_session(&self, session_id: &str) {
        let index = session_index(session_id);
        self.entries
            .write()
            .unwrap()
            .retain(|(slot_index, _), _| slot_index != &index);
    }
}
