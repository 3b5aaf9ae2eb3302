use serde::Serialize;

use crate::api::v1::extractors::IdentityContext;

/// Response of `GET /me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub uid: String,
    pub email: Option<String>,
    pub role: String,
}

impl From<&IdentityContext> for MeResponse {
    fn from(identity: &IdentityContext) -> Self {
        Self {
            uid: identity.subject.clone(),
            email: identity.email.clone(),
            role: identity.role.clone(),
        }
    }
}
