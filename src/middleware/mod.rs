/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - auth::access::apply(...), cors::CorsPolicy, http::apply(...)
 */
pub mod auth;
pub mod cors;
pub mod http;
