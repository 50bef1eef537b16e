/// Session Lifecycle Routes
///
/// Login issues an access token and a refresh session, refresh trades a
/// refresh token for a new access token, and revoke ends a session.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{authorization_header, extract_bearer, generate_refresh_token, CredentialHasher};
use crate::error::{AppError, AuthError, ConfigError, ErrorContext};
use crate::models::{Account, AccountCredentials};
use crate::startup::AppState;

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional shorter access-token lifetime
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: Account,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Access-token lifetime for a login
///
/// A requested lifetime is honoured only when it is positive and not longer
/// than the configured default.
fn access_token_lifetime(requested: Option<i64>, default_lifetime: i64) -> i64 {
    match requested {
        Some(seconds) if seconds > 0 && seconds <= default_lifetime => seconds,
        _ => default_lifetime,
    }
}

/// Check a login password and return the account it unlocks
///
/// An unknown email is verified against `placeholder_digest` so that both
/// failure paths pay the same bcrypt cost.
fn check_password(
    hasher: &CredentialHasher,
    credentials: Option<AccountCredentials>,
    placeholder_digest: &str,
    password: &str,
) -> Result<Account, AppError> {
    match credentials {
        Some(credentials) => {
            hasher.verify(&credentials.password_hash, password)?;
            Ok(credentials.account)
        }
        None => {
            hasher.verify(placeholder_digest, password)?;
            Err(AuthError::InvalidCredentials.into())
        }
    }
}

/// Expiry of a refresh session starting at `now`
fn session_expiry(now: DateTime<Utc>, lifetime_seconds: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_seconds(lifetime_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "jwt.refresh_token_expiry of {} seconds is out of range",
                lifetime_seconds
            ))
            .into()
        })
}

/// POST /api/login
///
/// # Errors
/// - 401: unknown email or wrong password (same response for both)
/// - 500: malformed stored digest, signing or entropy failure
///
/// # Security Notes
/// - Password verification runs on the blocking pool
/// - Neither the password nor the issued tokens are logged
pub async fn login(
    form: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");
    let LoginRequest {
        email,
        password,
        expires_in_seconds,
    } = form.into_inner();

    let credentials = state
        .accounts
        .find_credentials_by_email(email.trim())
        .await?;

    let hasher = state.hasher;
    let placeholder = state.placeholder_digest.clone();
    let account =
        web::block(move || check_password(&hasher, credentials, &placeholder, &password))
            .await??;

    let context = context.with_account_id(account.id);

    let lifetime = access_token_lifetime(expires_in_seconds, state.tokens.default_lifetime());
    let token = state.tokens.issue(&account.id.to_string(), lifetime)?;

    let refresh_token = generate_refresh_token()?;
    let expires_at = session_expiry(Utc::now(), state.refresh_token_expiry)?;
    state
        .sessions
        .save_session(account.id, &refresh_token, expires_at)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = account.id,
        access_token_lifetime = lifetime,
        "Account logged in"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        refresh_token,
        user: account,
    }))
}

/// POST /api/refresh
///
/// The bearer credential is a refresh token. A new access token with the
/// default lifetime is returned; the refresh token itself stays valid.
///
/// # Errors
/// - 401: malformed header, or unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");
    let refresh_token = extract_bearer(authorization_header(req.headers()))?;

    let account_id = state.sessions.resolve_session(refresh_token).await?;
    let token = state
        .tokens
        .issue(&account_id.to_string(), state.tokens.default_lifetime())?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = account_id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// Always 204 for a well-formed header, whether or not a session existed.
///
/// # Errors
/// - 401: missing or malformed header
pub async fn revoke(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("session_revoke");
    let refresh_token = extract_bearer(authorization_header(req.headers()))?;

    state.sessions.revoke_session(refresh_token).await?;

    tracing::info!(request_id = %context.request_id, "Refresh session revoked");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(4).unwrap()
    }

    fn credentials(hasher: &CredentialHasher, password: &str) -> AccountCredentials {
        AccountCredentials {
            account: Account {
                id: 1,
                email: "u@x.com".to_string(),
                is_chirpy_red: false,
            },
            password_hash: hasher.hash(password).unwrap(),
        }
    }

    #[test]
    fn test_matching_password_returns_account() {
        let h = hasher();
        let placeholder = h.hash("placeholder").unwrap();

        let account = check_password(&h, Some(credentials(&h, "pw123")), &placeholder, "pw123")
            .expect("Expected the account");
        assert_eq!(account.id, 1);
    }

    #[test]
    fn test_wrong_password_and_unknown_email_are_both_invalid() {
        let h = hasher();
        let placeholder = h.hash("placeholder").unwrap();

        for result in [
            check_password(&h, Some(credentials(&h, "pw123")), &placeholder, "wrong"),
            check_password(&h, None, &placeholder, "pw123"),
            // Even the placeholder's own password unlocks nothing
            check_password(&h, None, &placeholder, "placeholder"),
        ] {
            match result {
                Err(AppError::Auth(AuthError::InvalidCredentials)) => (),
                other => panic!("Expected InvalidCredentials, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_email_still_runs_bcrypt() {
        // A digest bcrypt cannot parse surfaces only if verification actually ran
        match check_password(&hasher(), None, "not-a-bcrypt-digest", "pw123") {
            Err(AppError::Crypto(CryptoError::MalformedDigest)) => (),
            other => panic!("Expected MalformedDigest, got {:?}", other),
        }
    }

    #[test]
    fn test_session_expiry_is_checked() {
        let now = Utc::now();

        assert_eq!(session_expiry(now, 60).unwrap(), now + Duration::seconds(60));
        assert!(session_expiry(now, i64::MAX / 1000).is_err());
        assert!(session_expiry(now, i64::MAX).is_err());
    }

    #[test]
    fn test_requested_lifetime_within_default_is_used() {
        assert_eq!(access_token_lifetime(Some(60), 3600), 60);
        assert_eq!(access_token_lifetime(Some(3600), 3600), 3600);
    }

    #[test]
    fn test_out_of_range_lifetime_falls_back_to_default() {
        assert_eq!(access_token_lifetime(None, 3600), 3600);
        assert_eq!(access_token_lifetime(Some(0), 3600), 3600);
        assert_eq!(access_token_lifetime(Some(-5), 3600), 3600);
        assert_eq!(access_token_lifetime(Some(7200), 3600), 3600);
    }
}
