use thiserror::Error;
use uuid::Uuid;
use wardkey_keyring::KeyringError;
use wardkey_responses::ResponseError;
use wardkey_session::SessionError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Patient-identifying data cannot be stored in plaintext; the workflow
    /// stops here until a strategy is configured.
    #[error("survey {0} has no unlock strategy configured; refusing patient-identifying data")]
    EncryptionNotConfigured(Uuid),

    /// The survey is encrypted and this request has no way to the key.
    #[error("no content key available for survey {0}")]
    KeyUnavailable(Uuid),

    #[error("survey {0} already has encryption configured")]
    AlreadyEncrypted(Uuid),

    #[error("response {0} not found")]
    ResponseNotFound(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;
