//! Durable audit sink backed by the shared database.

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use duckdb::params;
use uuid::Uuid;
use wardkey_keyring::{AuditEvent, AuditSink, KeyringError, KeyringResult};

/// Writes audit events to the `audit_log` table. Insert failures propagate:
/// an escrow unlock that cannot be audited does not proceed.
pub struct DbAuditSink {
    db: Database,
}

impl DbAuditSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl AuditSink for DbAuditSink {
    fn record(&self, event: AuditEvent) -> KeyringResult<()> {
        let json =
            serde_json::to_string(&event).map_err(|e| KeyringError::Audit(e.to_string()))?;
        let conn = self
            .db
            .lock()
            .map_err(|e| KeyringError::Audit(e.to_string()))?;
        conn.execute(
            "INSERT INTO audit_log (id, survey_id, event, recorded_at) VALUES (?, ?, ?, ?)",
            params![
                event.id.to_string(),
                event.survey_id.to_string(),
                json,
                event.recorded_at.timestamp_millis()
            ],
        )
        .map_err(|e| KeyringError::Audit(e.to_string()))?;
        Ok(())
    }
}

pub(crate) fn events_for_survey(db: &Database, survey_id: Uuid) -> StoreResult<Vec<AuditEvent>> {
    let conn = db.lock()?;
    let mut stmt = conn
        .prepare("SELECT event FROM audit_log WHERE survey_id = ? ORDER BY recorded_at, id")
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    let rows: Vec<String> = stmt
        .query_map(params![survey_id.to_string()], |row| row.get(0))
        .map_err(|e| StoreError::Storage(e.to_string()))?
        .filter_map(|r| r.ok())
        .collect();

    rows.iter()
        .map(|json| serde_json::from_str(json).map_err(|e| StoreError::Storage(e.to_string())))
        .collect()
}
