use thiserror::Error;
use wardkey_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("bundle encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
