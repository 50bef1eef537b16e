/// Password Hashing and Verification
///
/// Salted one-way hashing of account passwords with bcrypt.

use crate::error::{AppError, AuthError, ConfigError, CryptoError};

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;
// bcrypt ignores input past this length
const MAX_PASSWORD_BYTES: usize = 72;

/// Bcrypt hasher with a fixed work factor
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    /// Create a hasher with the given bcrypt cost
    ///
    /// # Errors
    /// Returns a config error if the cost is outside what bcrypt accepts
    pub fn new(cost: u32) -> Result<Self, AppError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(AppError::Config(ConfigError::InvalidValue(format!(
                "hashing.cost must be between {} and {}, got {}",
                MIN_COST, MAX_COST, cost
            ))));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password
    ///
    /// # Errors
    /// - `InvalidCredentials` for an empty password
    /// - `CryptoError::Hashing` if bcrypt fails
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        if plaintext.is_empty() {
            return Err(AuthError::InvalidCredentials.into());
        }

        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| CryptoError::Hashing(e.to_string()).into())
    }

    /// Verify a plaintext password against a stored digest
    ///
    /// The bcrypt comparison runs even for an empty password so the
    /// work factor is paid on every attempt.
    ///
    /// # Errors
    /// - `InvalidCredentials` when the password does not match, is empty, or
    ///   is longer than bcrypt reads
    /// - `CryptoError::MalformedDigest` when the digest is not a bcrypt hash
    pub fn verify(&self, digest: &str, plaintext: &str) -> Result<(), AppError> {
        let matches = bcrypt::verify(plaintext, digest)
            .map_err(|_| AppError::Crypto(CryptoError::MalformedDigest))?;

        if matches && !plaintext.is_empty() && plaintext.len() <= MAX_PASSWORD_BYTES {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials.into())
        }
    }
}
