/*
 * Responsibility
 * - 環境変数の読み込み (PORT, CORS 許可, 認証スキーム, 秘密鍵, ルートポリシーなど)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 * - 起動時に一度だけ構築し、以降は読み取り専用で共有する
 */
use std::fmt;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::auth::policy::{RoleRule, RoutePolicy};

/// HS256 needs at least 256 bits of key material.
pub const MIN_SECRET_BYTES: usize = 32;

const REQUEST_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=3_600;
// 1 min .. 30 days
const TOKEN_TTL_RANGE: RangeInclusive<u64> = 60..=2_592_000;
const LEEWAY_RANGE: RangeInclusive<u64> = 0..=300;
const IDP_TIMEOUT_MS_RANGE: RangeInclusive<u64> = 1..=60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which credential scheme authenticates API requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Tokens signed by this service (HS256).
    Local,
    /// Tokens verified by a remote identity provider.
    External,
}

impl FromStr for AuthScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "jwt" => Ok(Self::Local),
            "external" | "idp" => Ok(Self::External),
            _ => Err(ConfigError::Invalid("AUTH_SCHEME")),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub max_age_seconds: u64,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub scheme: AuthScheme,
    pub issuer: String,
    pub jwt_secret: Option<String>,
    pub token_ttl_seconds: u64,
    pub leeway_seconds: u64,
    pub idp_url: Option<Url>,
    pub idp_timeout: Duration,
    pub default_role: String,
    pub public_prefixes: Vec<String>,
    pub role_rules: Vec<RoleRule>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the secret
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("scheme", &self.scheme)
            .field("issuer", &self.issuer)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("idp_url", &self.idp_url.as_ref().map(Url::as_str))
            .field("idp_timeout", &self.idp_timeout)
            .field("default_role", &self.default_role)
            .field("public_prefixes", &self.public_prefixes)
            .field("role_rules", &self.role_rules)
            .finish()
    }
}

impl AuthConfig {
    pub fn route_policy(&self) -> RoutePolicy {
        RoutePolicy::new(&self.public_prefixes, self.role_rules.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub request_timeout: Duration,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the process env in production).
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = var("PORT").and_then(|s| s.parse().ok()).unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let request_timeout = Duration::from_secs(parse_bounded(
            var("REQUEST_TIMEOUT_SECONDS"),
            "REQUEST_TIMEOUT_SECONDS",
            30,
            REQUEST_TIMEOUT_RANGE,
        )?);

        let mut allowed_origins = split_list(var("CORS_ALLOWED_ORIGINS").as_deref(), ',');
        if allowed_origins.is_empty() {
            allowed_origins.push("http://localhost:4200".to_string());
        }
        let cors = CorsConfig {
            allowed_origins,
            max_age_seconds: var("CORS_MAX_AGE_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3600),
        };

        let auth = auth_from_vars(&var, app_env, request_timeout)?;

        Ok(Self {
            addr,
            app_env,
            request_timeout,
            cors,
            auth,
        })
    }
}

fn auth_from_vars<F>(
    var: &F,
    app_env: AppEnv,
    request_timeout: Duration,
) -> Result<AuthConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = match var("AUTH_ENABLED") {
        Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_ENABLED"))?,
        None => true,
    };
    if !enabled && app_env.is_production() {
        return Err(ConfigError::Invalid("AUTH_ENABLED"));
    }

    let scheme = match var("AUTH_SCHEME") {
        Some(v) => v.parse::<AuthScheme>()?,
        None => AuthScheme::Local,
    };

    let issuer = var("AUTH_ISSUER")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "asesorias-api".to_string());

    let jwt_secret = var("AUTH_JWT_SECRET").filter(|s| !s.is_empty());
    if let Some(secret) = &jwt_secret
        && secret.len() < MIN_SECRET_BYTES
    {
        return Err(ConfigError::Invalid("AUTH_JWT_SECRET"));
    }

    let token_ttl_seconds = parse_bounded(
        var("AUTH_TOKEN_TTL_SECONDS"),
        "AUTH_TOKEN_TTL_SECONDS",
        86_400, // 24h
        TOKEN_TTL_RANGE,
    )?;

    let leeway_seconds = parse_bounded(
        var("AUTH_LEEWAY_SECONDS"),
        "AUTH_LEEWAY_SECONDS",
        0,
        LEEWAY_RANGE,
    )?;

    let idp_url = match var("AUTH_IDP_URL").filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("AUTH_IDP_URL"))?),
        None => None,
    };

    // The provider call must finish inside the host request deadline.
    let idp_timeout = Duration::from_millis(parse_bounded(
        var("AUTH_IDP_TIMEOUT_MS"),
        "AUTH_IDP_TIMEOUT_MS",
        5_000,
        IDP_TIMEOUT_MS_RANGE,
    )?)
    .min(request_timeout);

    let default_role = var("AUTH_DEFAULT_ROLE")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "usuario".to_string());

    let mut public_prefixes = split_list(var("AUTH_PUBLIC_PREFIXES").as_deref(), ',');
    if public_prefixes.is_empty() {
        public_prefixes = vec![
            "/api/v1/auth".to_string(),
            "/api/v1/public".to_string(),
            "/health".to_string(),
        ];
    }
    if public_prefixes.iter().any(|p| !p.starts_with('/')) {
        return Err(ConfigError::Invalid("AUTH_PUBLIC_PREFIXES"));
    }

    let role_rules = RoutePolicy::parse_rules(&var("AUTH_ROLE_RULES").unwrap_or_default())
        .map_err(|_| ConfigError::Invalid("AUTH_ROLE_RULES"))?;

    if enabled {
        match scheme {
            AuthScheme::Local if jwt_secret.is_none() => {
                return Err(ConfigError::Missing("AUTH_JWT_SECRET"));
            }
            AuthScheme::External if idp_url.is_none() => {
                return Err(ConfigError::Missing("AUTH_IDP_URL"));
            }
            _ => {}
        }
    }

    Ok(AuthConfig {
        enabled,
        scheme,
        issuer,
        jwt_secret,
        token_ttl_seconds,
        leeway_seconds,
        idp_url,
        idp_timeout,
        default_role,
        public_prefixes,
        role_rules,
    })
}

fn split_list(raw: Option<&str>, sep: char) -> Vec<String> {
    raw.unwrap_or_default()
        .split(sep)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Absent -> default; present but unparsable or out of range -> Invalid.
fn parse_bounded(
    raw: Option<String>,
    key: &'static str,
    default: u64,
    range: RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| range.contains(v))
        .ok_or(ConfigError::Invalid(key))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_for_local_scheme() {
        let config = load(&[("AUTH_JWT_SECRET", SECRET)]).expect("config");

        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:4200"]);
        assert!(config.auth.enabled);
        assert_eq!(config.auth.scheme, AuthScheme::Local);
        assert_eq!(config.auth.default_role, "usuario");
        assert_eq!(config.auth.leeway_seconds, 0);
        assert_eq!(
            config.auth.public_prefixes,
            vec!["/api/v1/auth", "/api/v1/public", "/health"]
        );
        assert!(config.auth.role_rules.is_empty());
    }

    #[test]
    fn local_scheme_requires_a_long_enough_secret() {
        assert_eq!(
            load(&[]).expect_err("missing secret"),
            ConfigError::Missing("AUTH_JWT_SECRET")
        );
        assert_eq!(
            load(&[("AUTH_JWT_SECRET", "short")]).expect_err("short secret"),
            ConfigError::Invalid("AUTH_JWT_SECRET")
        );
    }

    #[test]
    fn external_scheme_requires_provider_url() {
        assert_eq!(
            load(&[("AUTH_SCHEME", "external")]).expect_err("missing url"),
            ConfigError::Missing("AUTH_IDP_URL")
        );

        let config = load(&[
            ("AUTH_SCHEME", "external"),
            ("AUTH_IDP_URL", "https://idp.example.com/verify"),
            ("AUTH_IDP_TIMEOUT_MS", "1500"),
        ])
        .expect("config");
        assert_eq!(config.auth.scheme, AuthScheme::External);
        assert_eq!(config.auth.idp_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn disabling_auth_is_refused_in_production() {
        let dev = load(&[("AUTH_ENABLED", "false")]).expect("dev may disable");
        assert!(!dev.auth.enabled);

        assert_eq!(
            load(&[("AUTH_ENABLED", "false"), ("APP_ENV", "production")])
                .expect_err("prod must not disable"),
            ConfigError::Invalid("AUTH_ENABLED")
        );
    }

    #[test]
    fn role_rules_and_prefixes_are_validated() {
        let config = load(&[
            ("AUTH_JWT_SECRET", SECRET),
            ("AUTH_PUBLIC_PREFIXES", "/auth, /public"),
            ("AUTH_ROLE_RULES", "DELETE /personas=admin"),
        ])
        .expect("config");
        assert_eq!(config.auth.public_prefixes, vec!["/auth", "/public"]);
        assert_eq!(config.auth.role_rules.len(), 1);

        assert_eq!(
            load(&[("AUTH_JWT_SECRET", SECRET), ("AUTH_ROLE_RULES", "nonsense")])
                .expect_err("bad rules"),
            ConfigError::Invalid("AUTH_ROLE_RULES")
        );
        assert_eq!(
            load(&[("AUTH_JWT_SECRET", SECRET), ("AUTH_PUBLIC_PREFIXES", "auth")])
                .expect_err("bad prefix"),
            ConfigError::Invalid("AUTH_PUBLIC_PREFIXES")
        );
    }

    #[test]
    fn provider_timeout_never_exceeds_the_request_deadline() {
        let config = load(&[
            ("AUTH_SCHEME", "external"),
            ("AUTH_IDP_URL", "https://idp.example.com/verify"),
            ("REQUEST_TIMEOUT_SECONDS", "1"),
        ])
        .expect("config");
        assert_eq!(config.auth.idp_timeout, Duration::from_secs(1));

        let config = load(&[
            ("AUTH_SCHEME", "external"),
            ("AUTH_IDP_URL", "https://idp.example.com/verify"),
            ("REQUEST_TIMEOUT_SECONDS", "10"),
            ("AUTH_IDP_TIMEOUT_MS", "2000"),
        ])
        .expect("config");
        assert_eq!(config.auth.idp_timeout, Duration::from_secs(2));
    }

    #[test]
    fn durations_are_range_checked() {
        for (key, value) in [
            ("AUTH_LEEWAY_SECONDS", "18446744073709551615"),
            ("AUTH_LEEWAY_SECONDS", "301"),
            ("AUTH_TOKEN_TTL_SECONDS", "0"),
            ("AUTH_TOKEN_TTL_SECONDS", "9223372036854775808"),
            ("AUTH_TOKEN_TTL_SECONDS", "soon"),
            ("REQUEST_TIMEOUT_SECONDS", "0"),
            ("AUTH_IDP_TIMEOUT_MS", "0"),
        ] {
            assert_eq!(
                load(&[("AUTH_JWT_SECRET", SECRET), (key, value)]).expect_err(key),
                ConfigError::Invalid(key),
                "{key}={value}"
            );
        }

        let config = load(&[
            ("AUTH_JWT_SECRET", SECRET),
            ("AUTH_LEEWAY_SECONDS", "300"),
            ("AUTH_TOKEN_TTL_SECONDS", "3600"),
        ])
        .expect("config");
        assert_eq!(config.auth.leeway_seconds, 300);
        assert_eq!(config.auth.token_ttl_seconds, 3600);
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let config = load(&[("AUTH_JWT_SECRET", SECRET)]).expect("config");
        let printed = format!("{:?}", config.auth);
        assert!(!printed.contains(SECRET));
        assert!(printed.contains("<redacted>"));
    }
}
