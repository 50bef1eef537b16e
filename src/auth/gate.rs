/// Per-request authentication decision
///
/// Turns an `Authorization` header into an `AuthenticatedAccount` or a rejection.
/// The actix middleware in `middleware::jwt_middleware` wraps this.

use crate::auth::header::extract_bearer;
use crate::auth::jwt::AccessTokenCodec;
use crate::error::{AppError, AuthError};
use crate::models::AccountId;
use crate::store::AccountStore;

/// Identity established by the gate, valid for the lifetime of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
}

/// Authenticate a request from its `Authorization` header
///
/// 1. extract the bearer token
/// 2. verify it as an access token
/// 3. parse the subject as an account id
/// 4. confirm the account still exists
///
/// # Errors
/// - `AuthError` for any rejection
/// - store errors from the existence check are passed through unchanged
pub async fn authenticate(
    header: Option<&str>,
    codec: &AccessTokenCodec,
    accounts: &dyn AccountStore,
) -> Result<AuthenticatedAccount, AppError> {
    let token = extract_bearer(header)?;
    let subject = codec.verify(token)?;

    let account_id: AccountId = subject
        .parse()
        .map_err(|_| AuthError::MissingOrMalformedAuth)?;

    // Deleted accounts lose access even while their tokens are unexpired
    if accounts.find_account(account_id).await?.is_none() {
        return Err(AuthError::AccountNotFound.into());
    }

    Ok(AuthenticatedAccount { account_id })
}
