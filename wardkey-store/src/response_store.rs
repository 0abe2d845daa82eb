//! Response rows. The three payload columns are individually nullable; which
//! ones are non-NULL is what downstream shape detection reads, so they are
//! never collapsed into a single blob.

use crate::error::{StoreError, StoreResult};
use chrono::DateTime;
use duckdb::{params, Connection};
use serde_json::Value;
use uuid::Uuid;
use wardkey_responses::ResponseRecord;

type ResponseRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
);

pub(crate) fn insert_response(conn: &Connection, record: &ResponseRecord) -> StoreResult<()> {
    let answers_json = match &record.answers {
        Some(value) => {
            Some(serde_json::to_string(value).map_err(|e| StoreError::Storage(e.to_string()))?)
        }
        None => None,
    };
    conn.execute(
        "INSERT INTO survey_responses (id, survey_id, answers, sealed_answers, sealed_demographics, submitted_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            record.id.to_string(),
            record.survey_id.to_string(),
            answers_json,
            record.sealed_answers,
            record.sealed_demographics,
            record.submitted_at.timestamp_millis()
        ],
    )
    .map_err(|e| StoreError::Storage(e.to_string()))?;
    Ok(())
}

pub(crate) fn load_response(
    conn: &Connection,
    survey_id: Uuid,
    response_id: Uuid,
) -> StoreResult<ResponseRecord> {
    let result = conn.query_row(
        "SELECT id, survey_id, answers, sealed_answers, sealed_demographics, submitted_at
         FROM survey_responses WHERE id = ? AND survey_id = ?",
        params![response_id.to_string(), survey_id.to_string()],
        row_to_parts,
    );
    match result {
        Ok(row) => parts_to_record(row),
        Err(duckdb::Error::QueryReturnedNoRows) => Err(StoreError::ResponseNotFound(response_id)),
        Err(e) => Err(StoreError::Storage(e.to_string())),
    }
}

pub(crate) fn responses_for_survey(
    conn: &Connection,
    survey_id: Uuid,
) -> StoreResult<Vec<ResponseRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, survey_id, answers, sealed_answers, sealed_demographics, submitted_at
             FROM survey_responses WHERE survey_id = ? ORDER BY submitted_at, id",
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    let rows: Vec<ResponseRow> = stmt
        .query_map(params![survey_id.to_string()], row_to_parts)
        .map_err(|e| StoreError::Storage(e.to_string()))?
        .filter_map(|r| r.ok())
        .collect();

    rows.into_iter().map(parts_to_record).collect()
}

fn row_to_parts(row: &duckdb::Row<'_>) -> duckdb::Result<ResponseRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parts_to_record(parts: ResponseRow) -> StoreResult<ResponseRecord> {
    let (id, survey_id, answers, sealed_answers, sealed_demographics, submitted_ms) = parts;
    let answers = match answers {
        Some(json) => Some(
            serde_json::from_str::<Value>(&json).map_err(|e| StoreError::Storage(e.to_string()))?,
        ),
        None => None,
    };
    Ok(ResponseRecord {
        id: id
            .parse()
            .map_err(|_| StoreError::Storage("invalid response id in storage".to_string()))?,
        survey_id: survey_id
            .parse()
            .map_err(|_| StoreError::Storage("invalid survey id in storage".to_string()))?,
        answers,
        sealed_answers,
        sealed_demographics,
        submitted_at: DateTime::from_timestamp_millis(submitted_ms)
            .ok_or_else(|| StoreError::Storage("invalid timestamp in storage".to_string()))?,
    })
}
