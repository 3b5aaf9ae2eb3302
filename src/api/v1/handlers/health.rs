/*
 * Responsibility
 * - GET /health (疎通用, 認証不要)
 * - public prefix に入っているので認証ミドルウェアは素通しする
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
