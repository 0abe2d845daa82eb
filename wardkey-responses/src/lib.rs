//! Sealing and opening of survey-response payloads under a survey's content
//! key. See [`record`] for the two coexisting storage shapes and their
//! detection rules.

mod error;
pub mod record;

pub use error::{ResponseError, ResponseResult};
pub use record::{seal_payload, ResponsePayload, ResponseRecord, ResponseShape};
