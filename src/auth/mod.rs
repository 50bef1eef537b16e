/// Authentication module
///
/// Handles access token issuance/verification, password hashing,
/// refresh token generation, credential header parsing and the
/// per-request authentication decision.

mod claims;
mod gate;
mod header;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use gate::{authenticate, AuthenticatedAccount};
pub use header::{authorization_header, extract_api_key, extract_bearer};
pub use jwt::AccessTokenCodec;
pub use password::CredentialHasher;
pub use refresh_token::{generate_refresh_token, hash_token, REFRESH_TOKEN_BYTES};

use crate::error::{AppError, CryptoError};

/// Exercise signing and the random source once at startup so a broken
/// key or entropy source stops the process instead of failing per request.
pub fn self_check(codec: &AccessTokenCodec) -> Result<(), AppError> {
    let token = codec.issue("0", codec.default_lifetime())?;
    codec.verify(&token).map_err(|e| {
        CryptoError::Signing(format!("issued token failed verification: {}", e))
    })?;
    generate_refresh_token()?;
    Ok(())
}
