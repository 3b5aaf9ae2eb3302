use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::auth::AuthError;

use super::IdentityContext;

/// Handler で IdentityContext を受け取るための extractor
/// middleware が IdentityContext を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（公開ルート・認証無効・ミドルウェア未設定）
pub struct Identity(pub IdentityContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Identity)
            .ok_or(AuthError::MissingCredential)
    }
}
