/// JWT Claims structure
///
/// Payload of an access token: standard registered claims (RFC 7519) only.

use serde::{Deserialize, Serialize};

/// Claims carried by every access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account id, decimal string)
    pub sub: String,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Build claims for `subject` issued at `now`, valid for `lifetime_seconds`
    ///
    /// Returns `None` if the expiry does not fit in a timestamp.
    pub fn new(subject: &str, now: i64, lifetime_seconds: i64, issuer: &str) -> Option<Self> {
        Some(Self {
            sub: subject.to_string(),
            iat: now,
            exp: now.checked_add(lifetime_seconds)?,
            iss: issuer.to_string(),
        })
    }

    /// Expiry is a hard boundary: the token is dead at the recorded second
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
