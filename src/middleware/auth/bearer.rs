//! `Authorization: Bearer <token>` parsing.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use sha2::{Digest, Sha256};

use crate::services::auth::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from request headers.
///
/// - header absent, or not starting with `Bearer ` -> `MissingCredential`
/// - header not visible ASCII, or nothing after the prefix -> `MalformedCredential`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    let raw = value
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let token = raw
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MissingCredential)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedCredential);
    }

    Ok(token)
}

/// Short, non-reversible token id for logs (first 8 bytes of SHA-256, hex).
pub fn token_fingerprint(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}
