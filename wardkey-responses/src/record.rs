//! Response records and the two sealed on-disk shapes.
//!
//! A record's shape is inferred from which fields are populated; there is
//! no version flag, and both shapes stay readable indefinitely:
//!
//! * **Legacy**: plaintext `answers` next to armored `sealed_demographics`.
//!   Old surveys encrypted only the demographics block.
//! * **Current**: armored `sealed_answers`, optionally armored
//!   `sealed_demographics`, each under its own fresh nonce.
//!
//! Sealed payloads are stored as base64 armor (nonce-prefixed ciphertext) so
//! they fit text columns unchanged. Opening a current-shape payload with the
//! wrong key is a hard [`ResponseError::DecryptionFailure`]; an unreadable
//! legacy demographics block instead degrades to an empty result, keeping
//! the plaintext answers beside it reachable.

use crate::error::{ResponseError, ResponseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;
use wardkey_crypto::{decrypt, encrypt, CipherKey, EncryptedData};

/// Which storage shape a record is in, derived purely from populated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// No ciphertext at all: the survey had no unlock strategy when the
    /// response was stored.
    Plaintext,
    /// Plaintext answers, sealed demographics.
    Legacy,
    /// Sealed answers, optionally sealed demographics.
    Current,
}

/// One survey submission as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub survey_id: Uuid,
    /// Plaintext answers. Populated on unencrypted rows and on legacy-shape
    /// rows, which never sealed their answers.
    pub answers: Option<Value>,
    /// Armored sealed answers; populating this is what makes a record
    /// current-shape.
    pub sealed_answers: Option<String>,
    /// Armored sealed demographics, written by both shapes.
    pub sealed_demographics: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// A fully opened record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePayload {
    pub answers: Value,
    pub demographics: Option<Value>,
}

impl ResponseRecord {
    /// An empty submission row; fill it with one of the `store_` operations.
    pub fn new(survey_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            survey_id,
            answers: None,
            sealed_answers: None,
            sealed_demographics: None,
            submitted_at: Utc::now(),
        }
    }

    /// A row for a survey with no encryption configured. Callers gate this
    /// behind the strategy check; it exists for surveys that never collect
    /// patient-identifying data.
    pub fn with_plaintext_answers(survey_id: Uuid, answers: Value) -> Self {
        Self {
            answers: Some(answers),
            ..Self::new(survey_id)
        }
    }

    /// Rebuilds a legacy-shape row: plaintext answers plus the demographics
    /// armor exactly as the old system wrote it.
    pub fn from_legacy_parts(
        survey_id: Uuid,
        answers: Value,
        demographics_armor: Option<String>,
    ) -> Self {
        Self {
            answers: Some(answers),
            sealed_demographics: demographics_armor,
            ..Self::new(survey_id)
        }
    }

    pub fn shape(&self) -> ResponseShape {
        if self.sealed_answers.is_some() {
            ResponseShape::Current
        } else if self.sealed_demographics.is_some() {
            ResponseShape::Legacy
        } else {
            ResponseShape::Plaintext
        }
    }

    /// True iff any ciphertext field is non-empty.
    pub fn is_encrypted(&self) -> bool {
        self.sealed_answers.is_some() || self.sealed_demographics.is_some()
    }

    // ── Store ──

    /// Seals an answers payload under the content key and clears the
    /// plaintext field in the same step; a record never holds both forms of
    /// the same payload.
    pub fn store_answers(&mut self, key: &CipherKey, answers: &Value) -> ResponseResult<()> {
        self.sealed_answers = Some(seal_payload(key, answers)?);
        self.answers = None;
        Ok(())
    }

    /// Seals answers and demographics under independent nonces, then clears
    /// both plaintext forms. Passing no demographics clears any stale
    /// demographics armor: the record afterwards holds exactly what was
    /// stored.
    pub fn store_complete_response(
        &mut self,
        key: &CipherKey,
        answers: &Value,
        demographics: Option<&Value>,
    ) -> ResponseResult<()> {
        self.sealed_answers = Some(seal_payload(key, answers)?);
        self.sealed_demographics = match demographics {
            Some(payload) => Some(seal_payload(key, payload)?),
            None => None,
        };
        self.answers = None;
        Ok(())
    }

    // ── Load ──

    /// Returns the answers payload, opening the sealed form when present.
    pub fn load_answers(&self, key: &CipherKey) -> ResponseResult<Value> {
        match &self.sealed_answers {
            Some(armor) => open_payload(key, armor),
            None => self.answers.clone().ok_or(ResponseError::MissingAnswers),
        }
    }

    /// Opens the whole record, whichever shape it is in.
    ///
    /// Legacy rows return their answers verbatim; an unreadable legacy
    /// demographics block is logged and dropped rather than raised.
    pub fn load_complete_response(&self, key: &CipherKey) -> ResponseResult<ResponsePayload> {
        let answers = self.load_answers(key)?;
        let demographics = match (self.shape(), &self.sealed_demographics) {
            (_, None) => None,
            (ResponseShape::Legacy, Some(armor)) => self.open_degrading(key, armor),
            (_, Some(armor)) => Some(open_payload(key, armor)?),
        };
        Ok(ResponsePayload {
            answers,
            demographics,
        })
    }

    /// Opens a record that carries no ciphertext at all. Refuses encrypted
    /// records rather than guessing at a key.
    pub fn load_plaintext(&self) -> ResponseResult<ResponsePayload> {
        if self.is_encrypted() {
            return Err(ResponseError::DecryptionFailure(
                "record is encrypted; a content key is required".to_string(),
            ));
        }
        Ok(ResponsePayload {
            answers: self.answers.clone().ok_or(ResponseError::MissingAnswers)?,
            demographics: None,
        })
    }

    fn open_degrading(&self, key: &CipherKey, armor: &str) -> Option<Value> {
        match open_payload(key, armor) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(
                    response = %self.id,
                    survey = %self.survey_id,
                    error = %e,
                    "legacy demographics unreadable, returning empty"
                );
                None
            }
        }
    }
}

/// Canonicalizes a payload to JSON bytes, seals it with a fresh nonce, and
/// armors the result for text-column storage.
pub fn seal_payload(key: &CipherKey, payload: &Value) -> ResponseResult<String> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(encrypt(key, &bytes)?.to_base64())
}

fn open_payload(key: &CipherKey, armor: &str) -> ResponseResult<Value> {
    let sealed = EncryptedData::from_base64(armor)
        .map_err(|e| ResponseError::DecryptionFailure(e.to_string()))?;
    let bytes =
        decrypt(key, &sealed).map_err(|e| ResponseError::DecryptionFailure(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wardkey_crypto::generate_random_key;

    #[test]
    fn shape_is_derived_from_populated_fields() {
        let key = generate_random_key();
        let survey = Uuid::new_v4();

        let plain = ResponseRecord::with_plaintext_answers(survey, json!({"q1": "yes"}));
        assert_eq!(plain.shape(), ResponseShape::Plaintext);
        assert!(!plain.is_encrypted());

        let legacy = ResponseRecord::from_legacy_parts(
            survey,
            json!({"q1": "yes"}),
            Some(seal_payload(&key, &json!({"nhs_number": "943"})).unwrap()),
        );
        assert_eq!(legacy.shape(), ResponseShape::Legacy);
        assert!(legacy.is_encrypted());

        let mut current = ResponseRecord::new(survey);
        current.store_answers(&key, &json!({"q1": "yes"})).unwrap();
        assert_eq!(current.shape(), ResponseShape::Current);
        assert!(current.is_encrypted());
    }

    #[test]
    fn storing_clears_the_plaintext_field() {
        let key = generate_random_key();
        let mut record =
            ResponseRecord::with_plaintext_answers(Uuid::new_v4(), json!({"q1": "yes"}));

        record.store_answers(&key, &json!({"q1": "yes"})).unwrap();
        assert!(record.answers.is_none());
    }

    #[test]
    fn empty_record_has_no_answers() {
        let key = generate_random_key();
        let record = ResponseRecord::new(Uuid::new_v4());
        assert!(matches!(
            record.load_answers(&key),
            Err(ResponseError::MissingAnswers)
        ));
    }
}
