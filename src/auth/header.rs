/// Credential header parsing
///
/// `Authorization: Bearer <token>` carries access and refresh tokens;
/// `Authorization: ApiKey <key>` carries the webhook key.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Raw `Authorization` header value, if present and valid UTF-8
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

/// Extract the token from `Bearer <token>`
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    extract_credential(header, BEARER_SCHEME)
}

/// Extract the key from `ApiKey <key>`
pub fn extract_api_key(header: Option<&str>) -> Result<&str, AuthError> {
    extract_credential(header, API_KEY_SCHEME)
}

/// Header must be exactly `<scheme> <credential>`, single space separated
fn extract_credential<'a>(header: Option<&'a str>, scheme: &str) -> Result<&'a str, AuthError> {
    let header = header.ok_or(AuthError::MissingOrMalformedAuth)?;
    let parts: Vec<&str> = header.split(' ').collect();

    match parts.as_slice() {
        [label, credential] if *label == scheme && !credential.is_empty() => Ok(*credential),
        _ => Err(AuthError::MissingOrMalformedAuth),
    }
}
