//! Remote identity provider (IdP) verification.
//!
//! The provider owns signature/issuer/expiry checking; this side only forwards the
//! raw token and maps outcomes:
//! - provider says "no"               -> `VerificationError::Rejected`
//! - transport, timeout, odd response -> `VerificationError::Unavailable`

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::services::auth::claims::Claims;
use crate::services::auth::verifier::{CredentialVerifier, VerificationError};

/// Identity facts as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpClaims {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum IdpError {
    #[error("token rejected by identity provider: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Transport(String),
}

/// The only boundary to the identity backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    // Backend name for logs.
    fn name(&self) -> &'static str;

    async fn verify_token(&self, raw: &str) -> Result<IdpClaims, IdpError>;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

/// `POST <endpoint>` with `{"token": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    endpoint: Url,
}

impl HttpIdentityProvider {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn verify_token(&self, raw: &str) -> Result<IdpClaims, IdpError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&VerifyRequest { token: raw })
            .send()
            .await
            .map_err(|err| IdpError::Transport(err.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => response
                .json::<IdpClaims>()
                .await
                .map_err(|err| IdpError::Transport(format!("undecodable response: {err}"))),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(IdpError::Rejected(format!("HTTP {status}")))
            }
            _ => Err(IdpError::Transport(format!("HTTP {status}"))),
        }
    }
}

#[derive(Clone)]
pub struct ExternalIdpVerifier {
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
    default_role: String,
}

impl std::fmt::Debug for ExternalIdpVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalIdpVerifier")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .field("default_role", &self.default_role)
            .finish()
    }
}

impl ExternalIdpVerifier {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        timeout: Duration,
        default_role: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            timeout,
            default_role: default_role.into(),
        }
    }

    pub async fn verify_token(&self, token: &str) -> Result<Claims, VerificationError> {
        // Don't bother the provider with something that can't be a token.
        if token.trim().is_empty() {
            return Err(VerificationError::Malformed);
        }

        let claims = tokio::time::timeout(self.timeout, self.provider.verify_token(token))
            .await
            .map_err(|_| VerificationError::Unavailable("identity provider timed out".into()))?
            .map_err(|err| match err {
                IdpError::Rejected(reason) => VerificationError::Rejected(reason),
                IdpError::Transport(reason) => VerificationError::Unavailable(reason),
            })?;

        let claims = Claims::from_unix(
            claims.uid,
            claims.email,
            claims.role,
            &self.default_role,
            claims.iat,
            claims.exp,
        )?;

        // The provider said yes, but an expired answer is still an expired token.
        if claims.expires_at() <= chrono::Utc::now() {
            return Err(VerificationError::Rejected("token expired".into()));
        }

        Ok(claims)
    }
}

impl CredentialVerifier for ExternalIdpVerifier {
    fn scheme(&self) -> &'static str {
        "external"
    }

    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Claims, VerificationError>> + Send + 'a>> {
        Box::pin(self.verify_token(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn verifier_for(server: &MockServer, timeout: Duration) -> ExternalIdpVerifier {
        let endpoint = Url::parse(&server.url("/verify")).expect("endpoint url");
        ExternalIdpVerifier::new(
            Arc::new(HttpIdentityProvider::new(endpoint)),
            timeout,
            "usuario",
        )
    }

    #[tokio::test]
    async fn accepted_token_becomes_claims() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/verify")
                    .json_body(json!({ "token": "good-token" }));
                then.status(200).json_body(json!({
                    "uid": "firebase-uid-1",
                    "email": "ana@example.com",
                    "role": "admin",
                    "iat": 1_700_000_000,
                    "exp": 4_000_000_000i64
                }));
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_secs(2));
        let claims = verifier.verify_token("good-token").await.expect("claims");

        assert_eq!(claims.subject(), "firebase-uid-1");
        assert_eq!(claims.email(), Some("ana@example.com"));
        assert_eq!(claims.role(), "admin");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_rejection_maps_to_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/verify");
                then.status(401).json_body(json!({ "error": "expired" }));
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_secs(2));
        let err = verifier.verify_token("stale").await.expect_err("rejected");
        assert!(matches!(err, VerificationError::Rejected(_)));
    }

    #[tokio::test]
    async fn expired_answer_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/verify");
                then.status(200)
                    .json_body(json!({ "uid": "old", "exp": 1_000_000_000i64 }));
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_secs(2));
        let err = verifier.verify_token("old-token").await.expect_err("expired");
        assert!(matches!(err, VerificationError::Rejected(_)));
    }

    #[tokio::test]
    async fn provider_failure_maps_to_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/verify");
                then.status(503);
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_secs(2));
        let err = verifier.verify_token("any").await.expect_err("unavailable");
        assert!(matches!(err, VerificationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_provider_fault() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/verify");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_secs(2));
        let err = verifier.verify_token("any").await.expect_err("unavailable");
        assert!(matches!(err, VerificationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/verify");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({ "uid": "late", "exp": 4_000_000_000i64 }));
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_millis(50));
        let err = verifier.verify_token("any").await.expect_err("timeout");
        assert!(matches!(err, VerificationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn blank_token_never_reaches_the_provider() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/verify");
                then.status(200);
            })
            .await;

        let verifier = verifier_for(&server, Duration::from_secs(2));
        let err = verifier.verify_token("   ").await.expect_err("blank");
        assert!(matches!(err, VerificationError::Malformed));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        // Nothing listens on the discard port.
        let endpoint = Url::parse("http://127.0.0.1:9/verify").expect("url");
        let verifier = ExternalIdpVerifier::new(
            Arc::new(HttpIdentityProvider::new(endpoint)),
            Duration::from_secs(2),
            "usuario",
        );

        let err = verifier.verify_token("any").await.expect_err("unreachable");
        assert!(matches!(err, VerificationError::Unavailable(_)));
    }
}
