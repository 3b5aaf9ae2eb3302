/*
 * Responsibility
 * - /auth/login, /auth/verify の request/response DTO
 * - validate() は形式チェックのみ (トークンの中身は services 側で検証)
 */
use serde::{Deserialize, Serialize};

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Token issued by the identity provider.
    #[serde(default)]
    pub id_token: Option<String>,
}

impl LoginRequest {
    /// Returns the trimmed provider token, or the 400 message.
    pub fn validate(&self) -> Result<&str, &'static str> {
        match self.id_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err("id_token es requerido"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: String,
    /// Seconds until expiry.
    pub expires_in: u64,
}

/// `{"authenticated": false}` or the verified identity.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl VerifyResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            uid: None,
            email: None,
            role: None,
        }
    }
}

/// Local part of an email address, used as a display name.
pub fn display_name(email: Option<&str>) -> Option<String> {
    let local = email?.split('@').next()?.trim();
    (!local.is_empty()).then(|| local.to_string())
}
