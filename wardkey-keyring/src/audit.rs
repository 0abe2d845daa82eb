//! Audit events for administratively significant key operations.
//!
//! Escrow unlocks are the break-glass path: every attempt is recorded,
//! successful or not, before any key material moves. The sink is a trait so
//! the store crate can persist events while tests capture them in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{KeyringError, KeyringResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    EscrowUnlockSucceeded,
    EscrowUnlockDenied,
    EscrowUnlockFailed,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuditAction::EscrowUnlockSucceeded => "escrow_unlock_succeeded",
            AuditAction::EscrowUnlockDenied => "escrow_unlock_denied",
            AuditAction::EscrowUnlockFailed => "escrow_unlock_failed",
        };
        f.write_str(name)
    }
}

/// One audit record: who did what to which survey, in which organization,
/// affecting which user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub actor: Uuid,
    pub action: AuditAction,
    pub survey_id: Uuid,
    pub org_id: Option<Uuid>,
    pub target_user: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor: Uuid,
        action: AuditAction,
        survey_id: Uuid,
        org_id: Option<Uuid>,
        target_user: Option<Uuid>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor,
            action,
            survey_id,
            org_id,
            target_user,
            metadata,
            recorded_at: Utc::now(),
        }
    }
}

/// Where audit events go.
///
/// Recording failure is a hard error at the call site: an escrow unlock that
/// cannot be audited does not happen.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> KeyringResult<()>;
}

/// In-memory sink for tests and tooling.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) -> KeyringResult<()> {
        self.events
            .lock()
            .map_err(|e| KeyringError::Audit(e.to_string()))?
            .push(event);
        Ok(())
    }
}
