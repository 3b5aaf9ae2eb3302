/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (外側から HTTP 共通 → 認証/CORS → deadline)
 * - axum::serve() で起動
 */
use std::panic;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::{AuthScheme, Config};
use crate::middleware;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,asesorias_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    // CatchPanicLayer turns the panic into a 500; the hook only makes sure it is logged.
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;
    init_panic_hook();

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = AppState::from_config(&config).context("failed to build auth services")?;
    log_auth_mode(&config, &state);

    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn log_auth_mode(config: &Config, state: &AppState) {
    if !config.auth.enabled {
        tracing::warn!("authentication is DISABLED: every route is reachable without a token");
        return;
    }

    let scheme = match config.auth.scheme {
        AuthScheme::Local => "local",
        AuthScheme::External => "external",
    };
    tracing::info!(
        scheme,
        issuer = %config.auth.issuer,
        login = state.exchange.is_some(),
        public_prefixes = ?config.auth.public_prefixes,
        role_rules = config.auth.role_rules.len(),
        "authentication enabled"
    );
}

/// Full application router: routes + auth/CORS + HTTP middleware.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state.clone());

    // deadline (inner) -> auth/CORS -> request-id/trace/panic/body limit (outer)
    let router = middleware::http::deadline(router, config.request_timeout);
    let router = middleware::auth::access::apply(router, state.auth.clone());
    middleware::http::apply(router)
}
