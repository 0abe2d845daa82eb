//! DuckDB-backed persistence and the survey vault facade.
//!
//! [`Database`] owns the single serialized connection and the schema.
//! [`SurveyVault`] is the entry point callers use: it loads keyrings, runs
//! unlocks with audit recording, seals and opens responses, and keeps
//! session credentials in an in-process vault. Row mapping for keyrings,
//! responses, and the audit log stays in private modules.

mod audit_store;
mod db;
mod error;
mod keyring_store;
mod response_store;
mod service;

pub use audit_store::DbAuditSink;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use service::SurveyVault;
