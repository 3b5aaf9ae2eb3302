use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tracing::error;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::local::LocalTokenClaims;

/// A freshly signed local token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Seconds until expiry.
    pub expires_in: u64,
}

/// Signs local tokens with the same secret/issuer `LocalTokenVerifier` checks.
#[derive(Clone)]
pub struct LocalTokenIssuer {
    issuer: String,
    ttl_seconds: u64,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for LocalTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTokenIssuer")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl LocalTokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            issuer: issuer.into(),
            ttl_seconds,
            encoding_key: EncodingKey::from_secret(secret),
        }
    }

    pub fn issue(
        &self,
        subject: &str,
        email: Option<&str>,
        role: &str,
    ) -> Result<IssuedToken, AppError> {
        if subject.trim().is_empty() {
            return Err(AppError::InvalidRequest("subject is required".to_string()));
        }

        let now = chrono::Utc::now().timestamp();
        let claims = LocalTokenClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            email: email.map(str::to_string),
            role: Some(role.to_string()),
            iat: Some(now),
            exp: now.saturating_add(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX)),
            jti: Some(Uuid::new_v4().to_string()),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign local token");
            AppError::Internal
        })?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::local::LocalTokenVerifier;

    const SECRET: &[u8] = b"test-secret-with-at-least-32-bytes!!";

    #[test]
    fn issued_tokens_round_trip_through_the_verifier() {
        let issuer = LocalTokenIssuer::new(SECRET, "asesorias-test", 3600);
        let verifier = LocalTokenVerifier::new(SECRET, "asesorias-test", 0, "usuario");

        let issued = issuer
            .issue("uid-7", Some("luis@example.com"), "programador")
            .expect("issue");
        assert_eq!(issued.expires_in, 3600);

        let claims = verifier.verify_token(&issued.token).expect("verify");
        assert_eq!(claims.subject(), "uid-7");
        assert_eq!(claims.email(), Some("luis@example.com"));
        assert_eq!(claims.role(), "programador");
        assert_eq!(
            (claims.expires_at() - claims.issued_at().expect("iat")).num_seconds(),
            3600
        );
    }

    #[test]
    fn zero_ttl_tokens_are_never_accepted() {
        let issuer = LocalTokenIssuer::new(SECRET, "asesorias-test", 0);
        let verifier = LocalTokenVerifier::new(SECRET, "asesorias-test", 0, "usuario");

        let issued = issuer.issue("uid-7", None, "usuario").expect("issue");
        assert!(verifier.verify_token(&issued.token).is_err());
    }

    #[test]
    fn blank_subject_is_refused() {
        let issuer = LocalTokenIssuer::new(SECRET, "asesorias-test", 3600);
        assert!(matches!(
            issuer.issue(" ", None, "usuario"),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
