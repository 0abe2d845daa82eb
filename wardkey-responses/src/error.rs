use thiserror::Error;
use wardkey_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum ResponseError {
    /// A sealed payload would not open under the presented content key.
    /// Wrong key and tampered ciphertext are indistinguishable here.
    #[error("response decryption failed: {0}")]
    DecryptionFailure(String),

    /// Sealing-side fault.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Payload would not serialize, or a freshly opened payload was not the
    /// JSON this crate wrote.
    #[error("response payload encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The record carries no answers in any shape.
    #[error("response record holds no answers payload")]
    MissingAnswers,
}

pub type ResponseResult<T> = Result<T, ResponseError>;
