//! Login exchange: identity-provider token in, locally signed token out.
//!
//! The provider remains the authority for who the caller is (and which role
//! they hold); the local token just carries that answer for the token's lifetime.

use crate::error::AppError;
use crate::services::auth::claims::Claims;
use crate::services::auth::idp::ExternalIdpVerifier;
use crate::services::auth::issuer::{IssuedToken, LocalTokenIssuer};
use crate::services::auth::verifier::VerificationError;

#[derive(Debug, Clone)]
pub struct TokenExchange {
    provider: ExternalIdpVerifier,
    issuer: LocalTokenIssuer,
}

impl TokenExchange {
    pub fn new(provider: ExternalIdpVerifier, issuer: LocalTokenIssuer) -> Self {
        Self { provider, issuer }
    }

    pub async fn exchange(&self, id_token: &str) -> Result<(Claims, IssuedToken), AppError> {
        let claims = match self.provider.verify_token(id_token).await {
            Ok(claims) => claims,
            Err(err) => {
                match &err {
                    VerificationError::Unavailable(_) => {
                        tracing::error!(error = %err, "identity provider failed during login")
                    }
                    _ => tracing::warn!(error = %err, "login rejected"),
                }
                return Err(AppError::Auth(err.into()));
            }
        };

        let issued = self
            .issuer
            .issue(claims.subject(), claims.email(), claims.role())?;

        tracing::info!(subject = %claims.subject(), role = %claims.role(), "local token issued");
        Ok((claims, issued))
    }
}
