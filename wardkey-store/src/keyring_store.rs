//! Wrapped-key and org-key rows. Records serialize whole into one column;
//! the strategy tag is broken out only for the (survey, strategy) primary
//! key, which is what makes a concurrent duplicate insert fail instead of
//! silently winning.

use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use duckdb::{params, Connection};
use uuid::Uuid;
use wardkey_keyring::{OrgKeyRecord, StrategyKind, SurveyKeyring, WrappedKeyRecord};

pub(crate) fn load_keyring(conn: &Connection, survey_id: Uuid) -> StoreResult<SurveyKeyring> {
    let mut stmt = conn
        .prepare("SELECT record FROM survey_keyrings WHERE survey_id = ? ORDER BY strategy")
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    let rows: Vec<String> = stmt
        .query_map(params![survey_id.to_string()], |row| row.get(0))
        .map_err(|e| StoreError::Storage(e.to_string()))?
        .filter_map(|r| r.ok())
        .collect();

    let mut records = Vec::with_capacity(rows.len());
    for json in &rows {
        let record: WrappedKeyRecord =
            serde_json::from_str(json).map_err(|e| StoreError::Storage(e.to_string()))?;
        records.push(record);
    }
    Ok(SurveyKeyring::from_records(survey_id, records))
}

pub(crate) fn insert_record(
    conn: &Connection,
    survey_id: Uuid,
    record: &WrappedKeyRecord,
) -> StoreResult<()> {
    let json = serde_json::to_string(record).map_err(|e| StoreError::Storage(e.to_string()))?;
    conn.execute(
        "INSERT INTO survey_keyrings (survey_id, strategy, record, created_at) VALUES (?, ?, ?, ?)",
        params![
            survey_id.to_string(),
            record.kind().to_string(),
            json,
            Utc::now().timestamp_millis()
        ],
    )
    .map_err(|e| StoreError::Storage(e.to_string()))?;
    Ok(())
}

/// Replaces the row for the record's strategy, keeping the original
/// created_at. Rotation writes go through here.
pub(crate) fn replace_record(
    conn: &Connection,
    survey_id: Uuid,
    record: &WrappedKeyRecord,
) -> StoreResult<()> {
    let json = serde_json::to_string(record).map_err(|e| StoreError::Storage(e.to_string()))?;
    let strategy = record.kind().to_string();
    conn.execute(
        "INSERT OR REPLACE INTO survey_keyrings (survey_id, strategy, record, created_at)
         VALUES (?, ?, ?, COALESCE((SELECT created_at FROM survey_keyrings WHERE survey_id = ? AND strategy = ?), ?))",
        params![
            survey_id.to_string(),
            strategy,
            json,
            survey_id.to_string(),
            strategy,
            Utc::now().timestamp_millis()
        ],
    )
    .map_err(|e| StoreError::Storage(e.to_string()))?;
    Ok(())
}

pub(crate) fn delete_record(
    conn: &Connection,
    survey_id: Uuid,
    kind: StrategyKind,
) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM survey_keyrings WHERE survey_id = ? AND strategy = ?",
        params![survey_id.to_string(), kind.to_string()],
    )
    .map_err(|e| StoreError::Storage(e.to_string()))?;
    Ok(())
}

pub(crate) fn load_org_key_record(
    conn: &Connection,
    org_id: Uuid,
) -> StoreResult<Option<OrgKeyRecord>> {
    let result: Result<String, _> = conn.query_row(
        "SELECT record FROM org_keys WHERE org_id = ?",
        params![org_id.to_string()],
        |row| row.get(0),
    );
    match result {
        Ok(json) => Ok(Some(
            serde_json::from_str(&json).map_err(|e| StoreError::Storage(e.to_string()))?,
        )),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Storage(e.to_string())),
    }
}

pub(crate) fn insert_org_key_record(conn: &Connection, record: &OrgKeyRecord) -> StoreResult<()> {
    let json = serde_json::to_string(record).map_err(|e| StoreError::Storage(e.to_string()))?;
    conn.execute(
        "INSERT INTO org_keys (org_id, record, created_at) VALUES (?, ?, ?)",
        params![
            record.org_id.to_string(),
            json,
            record.created_at.timestamp_millis()
        ],
    )
    .map_err(|e| StoreError::Storage(e.to_string()))?;
    Ok(())
}
