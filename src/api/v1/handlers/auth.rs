/*
 * Responsibility
 * - POST /auth/login: IdP トークン → ローカルトークンへの交換
 * - GET|POST /auth/verify: 手元のトークンが有効かどうかをクライアントに返す
 * - どちらも public ルート (認証ミドルウェアは素通し)。検証はここで明示的に行う
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
};

use crate::api::v1::dto::auth::{
    LoginRequest, LoginResponse, VerifyResponse, display_name,
};
use crate::error::AppError;
use crate::middleware::auth::access::verify_headers;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    // routes() は exchange がある時しか mount しないが、念のため
    let exchange = state.exchange.as_deref().ok_or(AppError::NotFound)?;

    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "login body rejected");
        AppError::invalid_request("Cuerpo de la solicitud inválido")
    })?;

    let id_token = req.validate().map_err(AppError::invalid_request)?;
    let (claims, issued) = exchange.exchange(id_token).await?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            token: issued.token,
            uid: claims.subject().to_string(),
            email: claims.email().map(str::to_string),
            display_name: display_name(claims.email()),
            role: claims.role().to_string(),
            expires_in: issued.expires_in,
        }),
    ))
}

pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, AppError> {
    let Some(verifier) = state.verifier() else {
        return Ok(Json(VerifyResponse::anonymous()));
    };
    if !headers.contains_key(header::AUTHORIZATION) {
        return Ok(Json(VerifyResponse::anonymous()));
    }

    let identity = verify_headers(verifier, &headers).await?;

    Ok(Json(VerifyResponse {
        authenticated: true,
        uid: Some(identity.subject),
        email: identity.email,
        role: Some(identity.role),
    }))
}
