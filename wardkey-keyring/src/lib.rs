//! Key hierarchy for survey content protection.
//!
//! # Architecture
//!
//! Every protected survey has exactly one 32-byte content key. That key is
//! never stored; it exists only wrapped, once per configured unlock strategy,
//! in the survey's [`SurveyKeyring`]:
//!
//! * **Password + recovery phrase**: two wraps of the same key, one under an
//!   Argon2id-derived key, one under a key derived from a 12-word phrase.
//! * **SSO**: wrapped under a key derived from the identity's stored secret.
//! * **Organization escrow**: wrapped under the org master key, itself
//!   wrapped under the platform key ([`platform`], [`org`]). Escrow unlocks
//!   are gated and audited ([`escrow`]).
//! * **Legacy hash**: no wrap at all; a salted digest verifies the shared
//!   key a pre-wrapping survey was created with, and the content key is
//!   derived from it ([`legacy`]).
//!
//! Unlocking any strategy yields the same content key plus a
//! [`ReplayCredential`] a session vault can seal: the wrapping key that
//! worked, never the content key or the password.
//!
//! Wrong credentials are `Ok(None)` across the board. Typed errors are
//! reserved for faults and for escrow gate refusals, which are authorization
//! decisions and leave an audit trail.

mod audit;
mod error;
mod keyring;
mod password;
mod record;
mod replay;
mod sso;

pub mod escrow;
pub mod legacy;
pub mod org;
pub mod platform;

pub use audit::{AuditAction, AuditEvent, AuditSink, MemoryAuditSink};
pub use error::{KeyringError, KeyringResult};
pub use escrow::{EscrowDenial, EscrowRequest, OrgRole};
pub use keyring::{StrategyUnlock, SurveyKeyring, UnlockGrant, UnlockSecret};
pub use org::OrgKeyRecord;
pub use password::{PasswordCredential, MIN_PASSWORD_LEN};
pub use platform::{CustodianShares, PlatformKey, SecretStore};
pub use record::{SaltedWrap, StrategyKind, WrappedKeyRecord};
pub use replay::ReplayCredential;
pub use sso::SsoIdentity;
