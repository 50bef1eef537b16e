/// Payment Provider Webhooks
///
/// Polka calls this endpoint when a subscription changes. Requests carry
/// `Authorization: ApiKey <key>`, compared in constant time against the
/// configured key.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::auth::{authorization_header, extract_api_key};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::models::AccountId;
use crate::startup::AppState;

const USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct WebhookData {
    pub user_id: AccountId,
}

#[derive(Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

fn api_key_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

/// POST /api/polka/webhooks
///
/// # Errors
/// - 401: missing, malformed or wrong API key
/// - 404: `user.upgraded` for an unknown account
pub async fn polka_webhook(
    req: HttpRequest,
    event: web::Json<WebhookEvent>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("polka_webhook");

    let key = extract_api_key(authorization_header(req.headers()))?;
    if !api_key_matches(key, &state.polka_key) {
        let err = AppError::Auth(AuthError::MissingOrMalformedAuth);
        context.log_error(&err);
        return Err(err);
    }

    if event.event != USER_UPGRADED {
        tracing::debug!(
            request_id = %context.request_id,
            event = %event.event,
            "Ignoring webhook event"
        );
        return Ok(HttpResponse::NoContent().finish());
    }

    let account_id = event.data.user_id;
    if !state.accounts.upgrade_account(account_id).await? {
        return Err(AppError::NotFound("User".to_string()));
    }

    tracing::info!(
        request_id = %context.request_id,
        account_id = account_id,
        "Account upgraded to Chirpy Red"
    );

    Ok(HttpResponse::NoContent().finish())
}
