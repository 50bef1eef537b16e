/// Chirp Routes
///
/// Creating and deleting chirps requires an authenticated account; reading is public.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthenticatedAccount;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::startup::AppState;
use crate::validators::{clean_chirp_body, validate_chirp_body};

#[derive(Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

/// Parse a path id; anything that is not a number is treated as a missing chirp
fn parse_chirp_id(raw: &str) -> Result<i32, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Chirp".to_string()))
}

/// POST /api/chirps
///
/// # Errors
/// - 400: body longer than 140 characters
/// - 401: rejected by the gate
pub async fn create_chirp(
    form: web::Json<CreateChirpRequest>,
    caller: web::ReqData<AuthenticatedAccount>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let caller = caller.into_inner();
    let context = ErrorContext::new("create_chirp").with_account_id(caller.account_id);

    validate_chirp_body(&form.body)?;
    let body = clean_chirp_body(&form.body);

    let chirp = state.chirps.create_chirp(caller.account_id, &body).await?;

    tracing::info!(
        request_id = %context.request_id,
        chirp_id = chirp.id,
        author_id = chirp.author_id,
        "Chirp created"
    );

    Ok(HttpResponse::Created().json(chirp))
}

/// GET /api/chirps
pub async fn list_chirps(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let chirps = state.chirps.list_chirps().await?;
    Ok(HttpResponse::Ok().json(chirps))
}

/// GET /api/chirps/{chirp_id}
pub async fn get_chirp(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_chirp_id(&path)?;

    match state.chirps.find_chirp(id).await? {
        Some(chirp) => Ok(HttpResponse::Ok().json(chirp)),
        None => Err(AppError::NotFound("Chirp".to_string())),
    }
}

/// DELETE /api/chirps/{chirp_id}
///
/// # Errors
/// - 401: rejected by the gate
/// - 403: the caller did not author the chirp
/// - 404: no such chirp
pub async fn delete_chirp(
    path: web::Path<String>,
    caller: web::ReqData<AuthenticatedAccount>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let caller = caller.into_inner();
    let context = ErrorContext::new("delete_chirp").with_account_id(caller.account_id);
    let id = parse_chirp_id(&path)?;

    let chirp = state
        .chirps
        .find_chirp(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp".to_string()))?;

    if chirp.author_id != caller.account_id {
        let err = AppError::Auth(AuthError::Forbidden);
        context.log_error(&err);
        return Err(err);
    }

    if !state.chirps.delete_chirp(id).await? {
        return Err(AppError::NotFound("Chirp".to_string()));
    }

    tracing::info!(
        request_id = %context.request_id,
        chirp_id = id,
        "Chirp deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
