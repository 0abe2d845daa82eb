use thiserror::Error;

/// Errors from the crypto primitives.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("secret sharing failed: {0}")]
    Sharing(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
