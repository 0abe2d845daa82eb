use crate::escrow::EscrowDenial;
use crate::record::StrategyKind;
use wardkey_crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error("strategy already configured: {0}")]
    StrategyExists(StrategyKind),

    #[error("strategy not configured: {0}")]
    StrategyMissing(StrategyKind),

    #[error("password too short (min 8 characters)")]
    PasswordTooShort,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("escrow denied: {0}")]
    EscrowDenied(EscrowDenial),

    #[error("platform vault component missing from secrets store")]
    PlatformComponentMissing,

    #[error("secret store error: {0}")]
    SecretStore(String),

    #[error("audit sink error: {0}")]
    Audit(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

pub type KeyringResult<T> = Result<T, KeyringError>;
