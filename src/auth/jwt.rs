/// JWT Token Generation and Validation
///
/// Creates and verifies the signed, time-bounded access tokens (HS256).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError, CryptoError};

/// Longest configurable token lifetime (100 years, in seconds)
pub const MAX_TOKEN_LIFETIME: i64 = 100 * 365 * 24 * 60 * 60;

/// Check that a configured lifetime is positive and at most `MAX_TOKEN_LIFETIME`
pub fn validate_lifetime(setting: &str, seconds: i64) -> Result<i64, ConfigError> {
    if seconds <= 0 || seconds > MAX_TOKEN_LIFETIME {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {} seconds, got {}",
            setting, MAX_TOKEN_LIFETIME, seconds
        )));
    }
    Ok(seconds)
}

/// Access token codec
///
/// Holds the process-wide signing key. Built once at startup from
/// configuration and shared read-only between workers.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    default_lifetime: i64,
}

impl AccessTokenCodec {
    /// Build the codec from JWT settings
    ///
    /// # Errors
    /// Returns a config error if the secret is empty, or if either token
    /// lifetime is not positive or exceeds `MAX_TOKEN_LIFETIME`
    pub fn new(config: &JwtSettings) -> Result<Self, AppError> {
        if config.secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()).into());
        }
        validate_lifetime("jwt.access_token_expiry", config.access_token_expiry)?;
        validate_lifetime("jwt.refresh_token_expiry", config.refresh_token_expiry)?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            default_lifetime: config.access_token_expiry,
        })
    }

    /// Configured access token lifetime in seconds
    pub fn default_lifetime(&self) -> i64 {
        self.default_lifetime
    }

    /// Issue an access token for `subject`, valid for `lifetime_seconds`
    ///
    /// # Errors
    /// Returns `CryptoError::Signing` if encoding fails or the expiry overflows
    pub fn issue(&self, subject: &str, lifetime_seconds: i64) -> Result<String, CryptoError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::new(subject, now, lifetime_seconds, &self.issuer)
            .ok_or_else(|| CryptoError::Signing("token expiry out of range".to_string()))?;

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// Verify an access token and return its subject
    ///
    /// # Errors
    /// - `InvalidSignature` if the signature does not match the secret
    /// - `Malformed` if the token or its claims cannot be decoded
    /// - `Expired` if the current second is at or past `exp`
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.decode_claims(token)?;

        if claims.is_expired_at(chrono::Utc::now().timestamp()) {
            tracing::debug!("Access token expired");
            return Err(AuthError::Expired);
        }

        Ok(claims.sub)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify` without leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    tracing::debug!("JWT decode error: {}", e);
                    AuthError::Malformed
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionPolicy;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
            session_policy: SessionPolicy::SingleSession,
        }
    }

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new(&get_test_config()).expect("Failed to build codec")
    }

    #[test]
    fn test_issue_and_verify_token() {
        let codec = codec();

        let token = codec.issue("17", 3600).expect("Failed to issue token");
        let subject = codec.verify(&token).expect("Failed to verify token");

        assert_eq!(subject, "17");
    }

    #[test]
    fn test_zero_lifetime_is_already_expired() {
        let codec = codec();

        let token = codec.issue("17", 0).unwrap();
        assert_eq!(codec.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let codec = codec();

        let token = codec.issue("17", -60).unwrap();
        assert_eq!(codec.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let issuing = codec();
        let mut other = get_test_config();
        other.secret = "a-completely-different-secret-value".to_string();
        let verifying = AccessTokenCodec::new(&other).unwrap();

        for lifetime in [3600, 0, -60] {
            let token = issuing.issue("17", lifetime).unwrap();
            assert_eq!(verifying.verify(&token), Err(AuthError::InvalidSignature));
        }
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();

        assert_eq!(codec.verify("invalid.token.here"), Err(AuthError::Malformed));
        assert_eq!(codec.verify(""), Err(AuthError::Malformed));
        assert_eq!(codec.verify("abc123"), Err(AuthError::Malformed));
    }

    #[test]
    fn test_tampered_token() {
        let codec = codec();
        let token = codec.issue("17", 3600).unwrap();

        let tampered = format!("{}X", token);
        let result = codec.verify(&tampered);

        assert!(matches!(
            result,
            Err(AuthError::InvalidSignature) | Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn test_wrong_issuer_is_malformed() {
        let issuing = codec();
        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        let verifying = AccessTokenCodec::new(&config).unwrap();

        let token = issuing.issue("17", 3600).unwrap();
        assert_eq!(verifying.verify(&token), Err(AuthError::Malformed));
    }

    #[test]
    fn test_lifetimes_must_be_positive() {
        let mut config = get_test_config();
        config.access_token_expiry = 0;
        assert!(AccessTokenCodec::new(&config).is_err());

        let mut config = get_test_config();
        config.refresh_token_expiry = -1;
        assert!(AccessTokenCodec::new(&config).is_err());
    }

    #[test]
    fn test_lifetimes_have_an_upper_bound() {
        let mut config = get_test_config();
        config.refresh_token_expiry = i64::MAX / 1000;
        match AccessTokenCodec::new(&config) {
            Err(AppError::Config(ConfigError::InvalidValue(msg))) => {
                assert!(msg.contains("jwt.refresh_token_expiry"))
            }
            Err(other) => panic!("Expected InvalidValue, got {:?}", other),
            Ok(_) => panic!("Expected InvalidValue, got a codec"),
        }

        let mut config = get_test_config();
        config.access_token_expiry = MAX_TOKEN_LIFETIME + 1;
        assert!(AccessTokenCodec::new(&config).is_err());

        let mut config = get_test_config();
        config.refresh_token_expiry = MAX_TOKEN_LIFETIME;
        assert!(AccessTokenCodec::new(&config).is_ok());
    }

    #[test]
    fn test_overflowing_lifetime_is_a_signing_error() {
        match codec().issue("17", i64::MAX) {
            Err(CryptoError::Signing(_)) => (),
            other => panic!("Expected Signing error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let mut config = get_test_config();
        config.secret = String::new();

        assert!(AccessTokenCodec::new(&config).is_err());
    }
}
