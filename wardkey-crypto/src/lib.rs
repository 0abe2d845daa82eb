//! Encryption primitives for Wardkey.
//!
//! Provides the building blocks of the key hierarchy:
//! - Argon2id for key derivation from passwords and recovery phrases
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Key wrapping with strict length checks
//! - BIP39 recovery phrases
//! - GF(256) Shamir sharing for custodian ceremonies
//!
//! # Architecture
//!
//! Every survey holds one 32-byte **content key** that directly encrypts its
//! response data. The content key is never stored raw; it exists in storage
//! only wrapped under **wrapping keys** derived from the credentials that can
//! recover it:
//!
//! 1. A password or recovery phrase, through Argon2id with a per-wrap salt.
//! 2. A stored per-identity secret, through domain-separated SHA-256.
//! 3. An organization master key, itself wrapped under the platform root.
//!
//! Unwrapping with the wrong credential fails on tag verification; the
//! primitive never yields corrupted key bytes, so every recovery path either
//! produces the identical content key or nothing.

mod cipher;
mod error;
mod key;
pub mod keyhash;
mod keywrap;
pub mod phrase;
pub mod shamir;

pub use cipher::{
    decrypt, decrypt_string, encrypt, encrypt_string, EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, derive_subkey, domain_digest, generate_random_key, CipherKey, KdfParams, Salt,
    KEY_SIZE, SALT_SIZE,
};
pub use keyhash::{content_key_from_shared, salted_key_digest, verify_key_digest};
pub use keywrap::{unwrap_key, wrap_key};
pub use phrase::{
    generate_phrase, normalize_phrase, phrase_to_wrapping_key, validate_phrase, PhraseHint,
    PHRASE_WORDS,
};
pub use shamir::Share;
