//! Password + recovery-phrase strategy.
//!
//! One setup call produces two independent wraps of the content key: one
//! under an Argon2id key from the password, one under an Argon2id key from a
//! freshly generated 12-word phrase. Either credential alone recovers the
//! key, so a forgotten password is survivable without weakening either path.
//! The phrase is returned exactly once and never stored; only its first and
//! last word survive as a hint.

use crate::error::{KeyringError, KeyringResult};
use crate::keyring::StrategyUnlock;
use crate::record::{SaltedWrap, WrappedKeyRecord};
use wardkey_crypto::phrase::{generate_phrase, phrase_to_wrapping_key, PhraseHint};
use wardkey_crypto::{derive_key, unwrap_key, wrap_key, CipherKey, CryptoError, KdfParams, Salt};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Which of the two credentials the caller is presenting.
#[derive(Clone, Copy)]
pub enum PasswordCredential<'a> {
    Password(&'a str),
    RecoveryPhrase(&'a str),
}

/// Sets up the strategy: generates a recovery phrase and wraps the content
/// key under both credentials.
///
/// Returns the record and the phrase. The phrase must be shown to the user
/// once and then dropped; it cannot be retrieved later, only regenerated.
pub fn setup(
    content_key: &CipherKey,
    password: &str,
    params: &KdfParams,
) -> KeyringResult<(WrappedKeyRecord, String)> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(KeyringError::PasswordTooShort);
    }

    let phrase = generate_phrase()?;

    let record = WrappedKeyRecord::PasswordRecovery {
        password_wrap: wrap_under_password(content_key, password, params)?,
        phrase_wrap: wrap_under_phrase(content_key, &phrase, params)?,
        hint: PhraseHint::for_phrase(&phrase),
    };

    Ok((record, phrase))
}

pub(crate) fn wrap_under_password(
    content_key: &CipherKey,
    password: &str,
    params: &KdfParams,
) -> KeyringResult<SaltedWrap> {
    let salt = Salt::random();
    let wrapping_key = derive_key(password, &salt, params)?;
    Ok(SaltedWrap {
        salt: *salt.as_bytes(),
        wrapped_key: wrap_key(&wrapping_key, content_key)?,
    })
}

pub(crate) fn wrap_under_phrase(
    content_key: &CipherKey,
    phrase: &str,
    params: &KdfParams,
) -> KeyringResult<SaltedWrap> {
    let salt = Salt::random();
    let wrapping_key = phrase_to_wrapping_key(phrase, &salt, params)?;
    Ok(SaltedWrap {
        salt: *salt.as_bytes(),
        wrapped_key: wrap_key(&wrapping_key, content_key)?,
    })
}

/// Attempts unlock with a password. Wrong password yields `Ok(None)`.
pub fn unlock_with_password(
    wrap: &SaltedWrap,
    password: &str,
    params: &KdfParams,
) -> KeyringResult<Option<StrategyUnlock>> {
    let wrapping_key = derive_key(password, &Salt::from_bytes(wrap.salt), params)?;
    Ok(try_unwrap(&wrapping_key, wrap))
}

/// Attempts unlock with a recovery phrase. A mistyped or wrong phrase yields
/// `Ok(None)`.
pub fn unlock_with_phrase(
    wrap: &SaltedWrap,
    phrase: &str,
    params: &KdfParams,
) -> KeyringResult<Option<StrategyUnlock>> {
    let wrapping_key = match phrase_to_wrapping_key(phrase, &Salt::from_bytes(wrap.salt), params) {
        Ok(key) => key,
        // Not on the word list / bad checksum: a wrong credential, not a fault.
        Err(CryptoError::KeyDerivation(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(try_unwrap(&wrapping_key, wrap))
}

fn try_unwrap(wrapping_key: &CipherKey, wrap: &SaltedWrap) -> Option<StrategyUnlock> {
    match unwrap_key(wrapping_key, &wrap.wrapped_key) {
        Ok(content_key) => Some(StrategyUnlock {
            content_key,
            wrapping_key: wrapping_key.clone(),
        }),
        // Tag mismatch or a malformed record: fail closed either way.
        Err(_) => None,
    }
}

/// Re-wraps the content key under a new password.
///
/// 1. Recovers the content key with the current password or phrase.
/// 2. Wraps it under the new password with a fresh salt.
/// 3. Leaves the phrase wrap and hint untouched.
///
/// A wrong current credential is `InvalidCredential` and the record is
/// unchanged.
pub fn rotate_password(
    record: &WrappedKeyRecord,
    current: PasswordCredential<'_>,
    new_password: &str,
    params: &KdfParams,
) -> KeyringResult<WrappedKeyRecord> {
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(KeyringError::PasswordTooShort);
    }

    let WrappedKeyRecord::PasswordRecovery {
        password_wrap,
        phrase_wrap,
        hint,
    } = record
    else {
        return Err(KeyringError::StrategyMissing(
            crate::record::StrategyKind::PasswordRecovery,
        ));
    };

    let unlocked = match current {
        PasswordCredential::Password(password) => {
            unlock_with_password(password_wrap, password, params)?
        }
        PasswordCredential::RecoveryPhrase(phrase) => {
            unlock_with_phrase(phrase_wrap, phrase, params)?
        }
    }
    .ok_or(KeyringError::InvalidCredential)?;

    Ok(WrappedKeyRecord::PasswordRecovery {
        password_wrap: wrap_under_password(&unlocked.content_key, new_password, params)?,
        phrase_wrap: phrase_wrap.clone(),
        hint: hint.clone(),
    })
}

/// Replaces the recovery phrase.
///
/// 1. Recovers the content key with the password.
/// 2. Generates a fresh phrase and wraps the key under it.
/// 3. Replaces the hint; the old phrase stops working.
///
/// Returns the new record and the new phrase (shown once, as at setup).
pub fn regenerate_phrase(
    record: &WrappedKeyRecord,
    password: &str,
    params: &KdfParams,
) -> KeyringResult<(WrappedKeyRecord, String)> {
    let WrappedKeyRecord::PasswordRecovery { password_wrap, .. } = record else {
        return Err(KeyringError::StrategyMissing(
            crate::record::StrategyKind::PasswordRecovery,
        ));
    };

    let unlocked = unlock_with_password(password_wrap, password, params)?
        .ok_or(KeyringError::InvalidCredential)?;

    let phrase = generate_phrase()?;
    let new_record = WrappedKeyRecord::PasswordRecovery {
        password_wrap: password_wrap.clone(),
        phrase_wrap: wrap_under_phrase(&unlocked.content_key, &phrase, params)?,
        hint: PhraseHint::for_phrase(&phrase),
    };

    Ok((new_record, phrase))
}
