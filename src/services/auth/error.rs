use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Authentication/authorization failures. Each one is terminal for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Token no proporcionado")]
    MissingCredential,

    #[error("Formato de token inválido")]
    MalformedCredential,

    #[error("Token inválido o expirado")]
    InvalidOrExpiredCredential,

    #[error("Error interno del servidor")]
    VerifierUnavailable,

    #[error("Permisos insuficientes")]
    InsufficientRole,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::InvalidOrExpiredCredential => StatusCode::UNAUTHORIZED,
            AuthError::VerifierUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-stable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::MalformedCredential => "MALFORMED_CREDENTIAL",
            AuthError::InvalidOrExpiredCredential => "INVALID_CREDENTIAL",
            AuthError::VerifierUnavailable => "VERIFIER_UNAVAILABLE",
            AuthError::InsufficientRole => "INSUFFICIENT_ROLE",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AuthError::MissingCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MalformedCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidOrExpiredCredential.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::VerifierUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthError::InsufficientRole.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn response_carries_json_error_body() {
        let res = AuthError::MissingCredential.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }
}
