/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /auth 配下は public prefix (ミドルウェアは検証しない), /me は保護ルート
 * - /auth/login は交換の設定がある時だけ mount する
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    auth::{login, verify},
    me::me,
};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/auth/verify", get(verify).post(verify))
        .route("/me", get(me));

    if state.exchange.is_some() {
        router.route("/auth/login", post(login))
    } else {
        router
    }
}
