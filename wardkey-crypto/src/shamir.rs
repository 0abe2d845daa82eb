//! Shamir secret sharing over GF(256) for custodian key ceremonies.
//!
//! The secret is shared byte-wise: each byte gets its own random polynomial
//! of degree `threshold - 1` with the secret byte as the constant term.
//! Any `threshold` shares reconstruct the secret by Lagrange interpolation
//! at x = 0; fewer reveal nothing about it. Share indices run 1..=n (x = 0
//! would be the secret itself).
//!
//! Arithmetic is in GF(2^8) modulo the AES polynomial 0x11b.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One custodian's fragment of a shared secret.
///
/// The y-bytes are secret and zeroize on drop; the x-coordinate is public
/// bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    #[zeroize(skip)]
    pub index: u8,
    pub data: Vec<u8>,
}

impl Share {
    /// Text form for handing to a custodian: `index-hexbytes`.
    pub fn to_hex(&self) -> String {
        format!("{}-{}", self.index, hex::encode(&self.data))
    }

    /// Parses the text form produced by [`Share::to_hex`].
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let (index_part, data_part) = encoded
            .split_once('-')
            .ok_or_else(|| CryptoError::Sharing("share must be index-hexbytes".to_string()))?;

        let index: u8 = index_part
            .parse()
            .map_err(|_| CryptoError::Sharing(format!("invalid share index: {index_part}")))?;
        if index == 0 {
            return Err(CryptoError::Sharing("share index must be nonzero".to_string()));
        }

        let data = hex::decode(data_part)
            .map_err(|e| CryptoError::Sharing(format!("invalid share hex: {e}")))?;

        Ok(Self { index, data })
    }
}

/// Splits a secret into `share_count` shares, any `threshold` of which
/// reconstruct it.
pub fn split(secret: &[u8], threshold: u8, share_count: u8) -> CryptoResult<Vec<Share>> {
    if threshold < 2 || threshold > share_count {
        return Err(CryptoError::Sharing(format!(
            "invalid parameters: threshold {threshold} of {share_count} shares"
        )));
    }
    if secret.is_empty() {
        return Err(CryptoError::Sharing("secret is empty".to_string()));
    }

    // Degree-(threshold - 1) polynomial per secret byte: constant term is the
    // secret byte, remaining coefficients random.
    let mut coefficients = vec![vec![0u8; threshold as usize]; secret.len()];
    for (byte_index, byte) in secret.iter().enumerate() {
        coefficients[byte_index][0] = *byte;
        rand::rngs::OsRng.fill_bytes(&mut coefficients[byte_index][1..]);
    }

    let shares = (1..=share_count)
        .map(|x| {
            let data = coefficients
                .iter()
                .map(|poly| evaluate(poly, x))
                .collect::<Vec<u8>>();
            Share { index: x, data }
        })
        .collect();

    for poly in &mut coefficients {
        poly.zeroize();
    }

    Ok(shares)
}

/// Reconstructs the secret from at least `threshold` shares.
///
/// Extra shares beyond the threshold are ignored. Shares of mismatched length
/// or duplicate index are rejected rather than silently interpolated into
/// garbage.
pub fn combine(shares: &[Share], threshold: u8) -> CryptoResult<Vec<u8>> {
    if threshold < 2 {
        return Err(CryptoError::Sharing(format!(
            "invalid threshold {threshold}"
        )));
    }
    if shares.len() < threshold as usize {
        return Err(CryptoError::Sharing(format!(
            "{} shares provided, {threshold} required",
            shares.len()
        )));
    }

    let used = &shares[..threshold as usize];
    let secret_len = used[0].data.len();

    for share in used {
        if share.index == 0 {
            return Err(CryptoError::Sharing("share index must be nonzero".to_string()));
        }
        if share.data.len() != secret_len {
            return Err(CryptoError::Sharing(format!(
                "share length mismatch: {} vs {secret_len}",
                share.data.len()
            )));
        }
    }
    for (i, a) in used.iter().enumerate() {
        if used[i + 1..].iter().any(|b| b.index == a.index) {
            return Err(CryptoError::Sharing(format!(
                "duplicate share index {}",
                a.index
            )));
        }
    }

    let mut secret = vec![0u8; secret_len];
    for (byte_index, out) in secret.iter_mut().enumerate() {
        let mut accumulator = 0u8;
        for (i, share_i) in used.iter().enumerate() {
            // Lagrange basis for share i evaluated at x = 0.
            let mut numerator = 1u8;
            let mut denominator = 1u8;
            for (j, share_j) in used.iter().enumerate() {
                if i == j {
                    continue;
                }
                numerator = gf_mul(numerator, share_j.index);
                denominator = gf_mul(denominator, share_i.index ^ share_j.index);
            }
            let basis = gf_mul(numerator, gf_inv(denominator)?);
            accumulator ^= gf_mul(share_i.data[byte_index], basis);
        }
        *out = accumulator;
    }

    Ok(secret)
}

/// Evaluates a polynomial (coefficients low-to-high) at x via Horner's rule.
fn evaluate(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    for _ in 0..8 {
        if b & 1 == 1 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b; // x^8 reduced by the AES polynomial 0x11b
        }
        b >>= 1;
    }
    product
}

fn gf_pow(mut a: u8, mut exponent: u8) -> u8 {
    let mut result = 1u8;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = gf_mul(result, a);
        }
        a = gf_mul(a, a);
        exponent >>= 1;
    }
    result
}

fn gf_inv(a: u8) -> CryptoResult<u8> {
    if a == 0 {
        // Distinct nonzero share indices make this unreachable in practice.
        return Err(CryptoError::Sharing("inverse of zero".to_string()));
    }
    // a^254 = a^-1 in GF(2^8)
    Ok(gf_pow(a, 254))
}
