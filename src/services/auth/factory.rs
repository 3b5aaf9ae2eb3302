//! Factory: build the configured verifier (and optional login exchange) from `AuthConfig`.
use std::sync::Arc;

use crate::config::{AuthConfig, AuthScheme, ConfigError};
use crate::services::auth::{
    CredentialVerifier, ExternalIdpVerifier, HttpIdentityProvider, LocalTokenIssuer,
    LocalTokenVerifier, TokenExchange,
};

/// `Ok(None)` when authentication is disabled.
pub fn build_verifier(
    config: &AuthConfig,
) -> Result<Option<Arc<dyn CredentialVerifier>>, ConfigError> {
    if !config.enabled {
        return Ok(None);
    }

    let verifier: Arc<dyn CredentialVerifier> = match config.scheme {
        AuthScheme::Local => {
            let secret = config
                .jwt_secret
                .as_deref()
                .ok_or(ConfigError::Missing("AUTH_JWT_SECRET"))?;
            Arc::new(LocalTokenVerifier::new(
                secret.as_bytes(),
                &config.issuer,
                config.leeway_seconds,
                config.default_role.clone(),
            ))
        }
        AuthScheme::External => Arc::new(external_verifier(config)?),
    };

    Ok(Some(verifier))
}

/// Login exchange needs both halves: a provider to trust and a secret to sign with.
pub fn build_exchange(config: &AuthConfig) -> Result<Option<TokenExchange>, ConfigError> {
    if !config.enabled || config.scheme != AuthScheme::Local || config.idp_url.is_none() {
        return Ok(None);
    }

    let secret = config
        .jwt_secret
        .as_deref()
        .ok_or(ConfigError::Missing("AUTH_JWT_SECRET"))?;

    let issuer = LocalTokenIssuer::new(
        secret.as_bytes(),
        config.issuer.clone(),
        config.token_ttl_seconds,
    );

    Ok(Some(TokenExchange::new(external_verifier(config)?, issuer)))
}

fn external_verifier(config: &AuthConfig) -> Result<ExternalIdpVerifier, ConfigError> {
    let endpoint = config
        .idp_url
        .clone()
        .ok_or(ConfigError::Missing("AUTH_IDP_URL"))?;

    Ok(ExternalIdpVerifier::new(
        Arc::new(HttpIdentityProvider::new(endpoint)),
        config.idp_timeout,
        config.default_role.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap;

    fn auth_config(pairs: &[(&str, &str)]) -> AuthConfig {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::from_vars(|key| vars.get(key).map(|v| v.to_string()))
            .expect("config")
            .auth
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn disabled_auth_builds_no_verifier() {
        let config = auth_config(&[("AUTH_ENABLED", "false")]);
        assert!(build_verifier(&config).expect("build").is_none());
        assert!(build_exchange(&config).expect("build").is_none());
    }

    #[test]
    fn scheme_selects_the_verifier_variant() {
        let local = auth_config(&[("AUTH_JWT_SECRET", SECRET)]);
        let verifier = build_verifier(&local).expect("build").expect("enabled");
        assert_eq!(verifier.scheme(), "local");

        let external = auth_config(&[
            ("AUTH_SCHEME", "external"),
            ("AUTH_IDP_URL", "http://127.0.0.1:9/verify"),
        ]);
        let verifier = build_verifier(&external).expect("build").expect("enabled");
        assert_eq!(verifier.scheme(), "external");
    }

    #[test]
    fn exchange_only_exists_for_local_scheme_with_provider() {
        let local_only = auth_config(&[("AUTH_JWT_SECRET", SECRET)]);
        assert!(build_exchange(&local_only).expect("build").is_none());

        let with_provider = auth_config(&[
            ("AUTH_JWT_SECRET", SECRET),
            ("AUTH_IDP_URL", "http://127.0.0.1:9/verify"),
        ]);
        assert!(build_exchange(&with_provider).expect("build").is_some());

        let external = auth_config(&[
            ("AUTH_SCHEME", "external"),
            ("AUTH_IDP_URL", "http://127.0.0.1:9/verify"),
            ("AUTH_JWT_SECRET", SECRET),
        ]);
        assert!(build_exchange(&external).expect("build").is_none());
    }
}
