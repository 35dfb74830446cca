use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

use crate::domain::errors::{DomainError, DomainResult};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Keyed-MAC algorithms used by the redirect-style providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    HmacSha256,
    HmacSha512,
}

/// Computes a lowercase hex digest over a canonical parameter string.
///
/// Deterministic: identical inputs always yield identical digests. Fails only
/// when the key cannot be initialized; it never substitutes another algorithm.
pub fn sign(algorithm: MacAlgorithm, secret: &str, canonical: &str) -> DomainResult<String> {
    let digest = match algorithm {
        MacAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| DomainError::SignatureError(format!("HMAC-SHA256 key: {e}")))?;
            mac.update(canonical.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        MacAlgorithm::HmacSha512 => {
            let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
                .map_err(|e| DomainError::SignatureError(format!("HMAC-SHA512 key: {e}")))?;
            mac.update(canonical.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
    };
    Ok(digest)
}
