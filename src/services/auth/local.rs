use std::{future::Future, pin::Pin};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::services::auth::claims::Claims;
use crate::services::auth::verifier::{CredentialVerifier, VerificationError};

/// Claims carried by locally signed tokens (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LocalTokenClaims {
    pub iss: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Verifies tokens signed with the process-wide symmetric secret.
///
/// - signature (HS256 only; other algorithms are refused)
/// - `iss` must equal the configured issuer
/// - `exp` is required and `now >= exp` is rejected (plus configured leeway)
///
/// Every failure is reported as `Rejected` so callers cannot tell which check failed.
#[derive(Clone)]
pub struct LocalTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    leeway_seconds: u64,
    default_role: String,
}

impl std::fmt::Debug for LocalTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("LocalTokenVerifier")
            .field("validation", &self.validation)
            .field("default_role", &self.default_role)
            .finish()
    }
}

impl LocalTokenVerifier {
    pub fn new(
        secret: &[u8],
        issuer: &str,
        leeway_seconds: u64,
        default_role: impl Into<String>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        validation.leeway = leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            leeway_seconds,
            default_role: default_role.into(),
        }
    }

    /// Synchronous verification; the trait impl just wraps this.
    pub fn verify_token(&self, token: &str) -> Result<Claims, VerificationError> {
        if token.trim().is_empty() {
            return Err(VerificationError::Malformed);
        }

        let data =
            jsonwebtoken::decode::<LocalTokenClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|e| VerificationError::Rejected(format!("{:?}", e.kind())))?;
        let claims = data.claims;

        // jsonwebtoken accepts `exp == now`; we don't.
        let now = chrono::Utc::now().timestamp();
        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);
        if claims.exp.saturating_add(leeway) <= now {
            return Err(VerificationError::Rejected("expired".into()));
        }

        Claims::from_unix(
            claims.sub,
            claims.email,
            claims.role,
            &self.default_role,
            claims.iat,
            claims.exp,
        )
    }
}

impl CredentialVerifier for LocalTokenVerifier {
    fn scheme(&self) -> &'static str {
        "local"
    }

    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Claims, VerificationError>> + Send + 'a>> {
        Box::pin(async move { self.verify_token(token) })
    }
}
