/*
 * Responsibility
 * - GET /me (保護ルート)
 * - middleware が付与した IdentityContext をそのまま返す
 */
use axum::Json;

use crate::api::v1::{dto::identity::MeResponse, extractors::Identity};

pub async fn me(Identity(identity): Identity) -> Json<MeResponse> {
    Json(MeResponse::from(&identity))
}
