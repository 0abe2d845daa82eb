//! Per-request re-derivation of survey content keys without ever storing
//! them. See [`vault`] for the sealed-bundle design and its state machine.

mod error;
pub mod vault;

pub use error::{SessionError, SessionResult};
pub use vault::{SessionKeyVault, DEFAULT_SESSION_TTL_MINUTES};
