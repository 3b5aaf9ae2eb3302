/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が Claims から組み立てて request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - 検証ロジックは middleware/services 側の責務
 * - リクエスト単位で生成され、リクエスト終了とともに破棄される（キャッシュしない）
 */
use std::fmt;
use std::sync::Arc;

use crate::services::auth::Claims;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `subject` は IdP / ローカルトークンの `sub`（安定した一意 ID）
/// - `role` は発行者が付与したロール（未指定ならデフォルトロール）
/// - 生トークンは下流サービスへの転送用に保持する（Debug には出さない）
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub subject: String,
    pub email: Option<String>,
    pub role: String,
    token: Arc<str>,
}

impl IdentityContext {
    pub fn from_claims(claims: &Claims, token: &str) -> Self {
        Self {
            subject: claims.subject().to_string(),
            email: claims.email().map(str::to_string),
            role: claims.role().to_string(),
            token: Arc::from(token),
        }
    }

    /// Raw bearer token, for forwarding to services that re-verify.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityContext")
            .field("subject", &self.subject)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"<redacted>")
            .finish()
    }
}
