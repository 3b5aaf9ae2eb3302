use std::{future::Future, pin::Pin};

use crate::services::auth::claims::Claims;
use crate::services::auth::error::AuthError;

/// Why a credential could not be turned into `Claims`.
///
/// The `String` payloads are internal diagnostics for logs. They never reach
/// the HTTP response (see `From<VerificationError> for AuthError`).
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("credential is blank")]
    Malformed,

    // Signature, issuer, expiry and structure failures all land here so callers
    // cannot tell which check failed.
    #[error("credential rejected: {0}")]
    Rejected(String),

    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

impl From<VerificationError> for AuthError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Malformed => AuthError::MalformedCredential,
            VerificationError::Rejected(_) => AuthError::InvalidOrExpiredCredential,
            VerificationError::Unavailable(_) => AuthError::VerifierUnavailable,
        }
    }
}

/// Turns an opaque bearer string into verified `Claims`.
///
/// Implementations are selected once at startup and shared across requests,
/// so they must not keep per-request state.
pub trait CredentialVerifier: Send + Sync {
    /// Short name for logs ("local", "external").
    fn scheme(&self) -> &'static str;

    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Claims, VerificationError>> + Send + 'a>>;
}
