//! Recovery phrases: 12-word BIP39 mnemonics backing the password strategy.
//!
//! A phrase is generated from OS entropy, never derived from the password.
//! It is shown to the user exactly once and thereafter only ever typed back
//! in.
//! Derivation to a wrapping key goes through Argon2id with a per-wrap random
//! salt, same as a password.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, CipherKey, KdfParams, Salt};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Words in a recovery phrase (128 bits of entropy).
pub const PHRASE_WORDS: usize = 12;

/// Generates a 12-word recovery phrase.
pub fn generate_phrase() -> CryptoResult<String> {
    // 128 bits of entropy for a 12-word mnemonic
    let mut entropy = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut entropy);

    let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
        .map_err(|e| CryptoError::KeyDerivation(format!("phrase generation failed: {e}")))?;

    Ok(mnemonic.to_string())
}

/// Collapses whitespace and case so a transcribed phrase matches the
/// generated one. Word order is untouched.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Checks that a phrase is a valid BIP39 mnemonic (word list and checksum).
pub fn validate_phrase(phrase: &str) -> CryptoResult<()> {
    let _: bip39::Mnemonic = normalize_phrase(phrase)
        .parse()
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid recovery phrase: {e}")))?;
    Ok(())
}

/// Derives a wrapping key from a recovery phrase.
///
/// Validates the phrase first so a typo fails fast with a clear error instead
/// of deriving a key that unwraps nothing.
pub fn phrase_to_wrapping_key(
    phrase: &str,
    salt: &Salt,
    params: &KdfParams,
) -> CryptoResult<CipherKey> {
    let normalized = normalize_phrase(phrase);
    validate_phrase(&normalized)?;
    derive_key(&normalized, salt, params)
}

/// Non-secret confirmation data stored alongside the phrase wrap.
///
/// Two of twelve words let the UI ask "does your phrase start with X and end
/// with Y?" without the stored data coming anywhere near reconstructing the
/// phrase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseHint {
    pub first_word: String,
    pub last_word: String,
}

impl PhraseHint {
    pub fn for_phrase(phrase: &str) -> Self {
        let normalized = normalize_phrase(phrase);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        Self {
            first_word: words.first().copied().unwrap_or("").to_string(),
            last_word: words.last().copied().unwrap_or("").to_string(),
        }
    }

    /// True when the hint matches a candidate phrase, for UI confirmation
    /// before the expensive derivation runs.
    pub fn matches(&self, phrase: &str) -> bool {
        let candidate = Self::for_phrase(phrase);
        candidate == *self
    }
}
