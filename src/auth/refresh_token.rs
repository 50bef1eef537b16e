/// Refresh Token Generation
///
/// Refresh tokens are:
/// - 32 bytes from the operating system's CSPRNG, hex-encoded (64 characters)
/// - Opaque: no structure, no signature, nothing derived from the account or clock
/// - Stored server-side only as their SHA-256 digest

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Number of random bytes before hex encoding
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new refresh token
///
/// # Errors
/// Returns `CryptoError::Entropy` if the OS random source is unavailable
pub fn generate_refresh_token() -> Result<String, CryptoError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;

    Ok(hex::encode(bytes))
}

/// SHA-256 digest of a refresh token, the form persisted by the session stores
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
