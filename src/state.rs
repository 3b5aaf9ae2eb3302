/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: 認証ミドルウェア (RoutePolicy / CorsPolicy / verifier)
 *   - exchange: ログイン用トークン交換 (scheme=local かつ IdP 設定時のみ)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::auth::AuthenticationMiddleware;
use crate::middleware::cors::CorsPolicy;
use crate::services::auth::{
    CredentialVerifier, TokenExchange, build_exchange, build_verifier,
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: AuthenticationMiddleware,
    pub exchange: Option<Arc<TokenExchange>>,
}

impl AppState {
    pub fn new(auth: AuthenticationMiddleware, exchange: Option<TokenExchange>) -> Self {
        Self {
            auth,
            exchange: exchange.map(Arc::new),
        }
    }

    /// Build everything the router shares from a validated `Config`.
    pub fn from_config(config: &Config) -> Result<Self, crate::config::ConfigError> {
        let verifier = build_verifier(&config.auth)?;
        let exchange = build_exchange(&config.auth)?;

        let auth = AuthenticationMiddleware::new(
            config.auth.route_policy(),
            CorsPolicy::from_config(&config.cors),
            verifier,
        );

        Ok(Self::new(auth, exchange))
    }

    pub fn verifier(&self) -> Option<&dyn CredentialVerifier> {
        self.auth.verifier()
    }
}
