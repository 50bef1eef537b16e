/// Account Routes
///
/// Account creation and self-service update of email and password.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthenticatedAccount;
use crate::error::{AppError, ErrorContext};
use crate::startup::AppState;
use crate::validators::{is_valid_email, validate_password};

/// Body shared by account creation and update
#[derive(Deserialize)]
pub struct AccountRequest {
    pub email: String,
    pub password: String,
}

/// Validate the request and hash its password on the blocking pool
async fn validated_credentials(
    form: AccountRequest,
    state: &AppState,
) -> Result<(String, String), AppError> {
    let email = is_valid_email(&form.email)?;
    validate_password(&form.password)?;

    let hasher = state.hasher;
    let password = form.password;
    let password_hash = web::block(move || hasher.hash(&password)).await??;

    Ok((email, password_hash))
}

/// POST /api/users
///
/// # Errors
/// - 400: invalid email, empty or over-long password
/// - 409: email already registered
pub async fn create_user(
    form: web::Json<AccountRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let (email, password_hash) = validated_credentials(form.into_inner(), &state).await?;
    let account = match state.accounts.create_account(&email, &password_hash).await {
        Ok(account) => account,
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

    tracing::info!(
        request_id = %context.request_id,
        account_id = account.id,
        "Account created"
    );

    Ok(HttpResponse::Created().json(account))
}

/// PUT /api/users
///
/// Replaces the caller's email and password. The identity comes from the
/// authentication gate, never from the body.
///
/// # Errors
/// - 400: invalid email, empty or over-long password
/// - 401: rejected by the gate
/// - 409: email taken by another account
pub async fn update_user(
    form: web::Json<AccountRequest>,
    caller: web::ReqData<AuthenticatedAccount>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let caller = caller.into_inner();
    let context = ErrorContext::new("user_update").with_account_id(caller.account_id);

    let (email, password_hash) = validated_credentials(form.into_inner(), &state).await?;
    let account = state
        .accounts
        .update_account(caller.account_id, &email, &password_hash)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = account.id,
        "Account updated"
    );

    Ok(HttpResponse::Ok().json(account))
}
