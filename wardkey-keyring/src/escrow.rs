//! Organization-escrow strategy.
//!
//! The content key is wrapped under the organization's master key so an
//! administrator can recover a survey whose owner is gone. Unlock is
//! triple-gated (admin role, not the survey's own owner, and a typed
//! confirmation naming the survey), and every attempt lands in the audit log
//! before any key material moves.

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::error::{KeyringError, KeyringResult};
use crate::keyring::StrategyUnlock;
use crate::record::WrappedKeyRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;
use wardkey_crypto::{unwrap_key, wrap_key, CipherKey, EncryptedData};

/// The caller's role within the organization, as reported by the membership
/// module. This crate never manages membership itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Member,
    Admin,
    Owner,
}

impl OrgRole {
    pub fn is_admin(self) -> bool {
        matches!(self, OrgRole::Admin | OrgRole::Owner)
    }
}

/// Everything an escrow unlock must present at the call boundary.
#[derive(Debug, Clone)]
pub struct EscrowRequest {
    pub actor: Uuid,
    pub actor_role: OrgRole,
    pub survey_owner: Uuid,
    /// Typed confirmation; must equal [`expected_confirmation`] for the survey.
    pub confirmation: String,
}

/// Why an escrow unlock was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowDenial {
    NotAnAdmin,
    OwnerMustUseOwnAccess,
    ConfirmationMismatch,
}

impl std::fmt::Display for EscrowDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            EscrowDenial::NotAnAdmin => "caller is not an organization admin",
            EscrowDenial::OwnerMustUseOwnAccess => "survey owners must use their own access path",
            EscrowDenial::ConfirmationMismatch => "confirmation text does not match",
        };
        f.write_str(reason)
    }
}

/// The confirmation text an admin must type for a given survey.
///
/// Naming the survey in the confirmation keeps a copied phrase from unlocking
/// anything else.
pub fn expected_confirmation(survey_id: Uuid) -> String {
    format!("unlock {survey_id}")
}

/// Wraps the content key under the organization's master key.
pub fn setup(
    content_key: &CipherKey,
    org_id: Uuid,
    org_key: &CipherKey,
) -> KeyringResult<WrappedKeyRecord> {
    Ok(WrappedKeyRecord::OrgEscrow {
        org_id,
        wrapped_key: wrap_key(org_key, content_key)?,
    })
}

/// Attempts an escrow unlock.
///
/// 1. Audits and refuses non-admins.
/// 2. Audits and refuses the survey's own owner.
/// 3. Audits and refuses a wrong confirmation text.
/// 4. Unwraps; a failed unwrap (wrong org key, tampered record) is audited
///    and reported as `Ok(None)` like any other wrong credential.
/// 5. A successful unlock is audited before the key is returned.
pub fn unlock(
    survey_id: Uuid,
    org_id: Uuid,
    wrapped_key: &EncryptedData,
    request: &EscrowRequest,
    org_key: &CipherKey,
    audit: &dyn AuditSink,
) -> KeyringResult<Option<StrategyUnlock>> {
    if let Some(denial) = gate(request, survey_id) {
        warn!(
            actor = %request.actor,
            survey = %survey_id,
            org = %org_id,
            reason = %denial,
            "escrow unlock denied"
        );
        audit.record(denied_event(request, survey_id, org_id, denial))?;
        return Err(KeyringError::EscrowDenied(denial));
    }

    match unwrap_key(org_key, wrapped_key) {
        Ok(content_key) => {
            audit.record(AuditEvent::new(
                request.actor,
                AuditAction::EscrowUnlockSucceeded,
                survey_id,
                Some(org_id),
                Some(request.survey_owner),
                json!({}),
            ))?;
            Ok(Some(StrategyUnlock {
                content_key,
                wrapping_key: org_key.clone(),
            }))
        }
        Err(_) => {
            warn!(
                actor = %request.actor,
                survey = %survey_id,
                org = %org_id,
                "escrow unlock failed on unwrap"
            );
            audit.record(AuditEvent::new(
                request.actor,
                AuditAction::EscrowUnlockFailed,
                survey_id,
                Some(org_id),
                Some(request.survey_owner),
                json!({ "reason": "unwrap_failed" }),
            ))?;
            Ok(None)
        }
    }
}

fn gate(request: &EscrowRequest, survey_id: Uuid) -> Option<EscrowDenial> {
    if !request.actor_role.is_admin() {
        return Some(EscrowDenial::NotAnAdmin);
    }
    if request.actor == request.survey_owner {
        return Some(EscrowDenial::OwnerMustUseOwnAccess);
    }
    if request.confirmation != expected_confirmation(survey_id) {
        return Some(EscrowDenial::ConfirmationMismatch);
    }
    None
}

fn denied_event(
    request: &EscrowRequest,
    survey_id: Uuid,
    org_id: Uuid,
    denial: EscrowDenial,
) -> AuditEvent {
    AuditEvent::new(
        request.actor,
        AuditAction::EscrowUnlockDenied,
        survey_id,
        Some(org_id),
        Some(request.survey_owner),
        json!({ "reason": denial.to_string() }),
    )
}
