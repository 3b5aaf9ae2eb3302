//! CORS policy for browser clients.
//!
//! Note:
//! - CORS is enforced by browsers. Native apps and server-to-server calls are not restricted.
//! - Headers are written by the authentication middleware on *every* response
//!   (including 401/403/500), so browsers can read auth failures.
//!
//! Policy:
//! - Allow-Origin: the request's Origin when it is allow-listed, otherwise the first
//!   configured origin (the browser then blocks the response, which is the point).
//! - Allow-Credentials: true, except with a wildcard origin.
//!
//! IMPORTANT:
//! - Never combine wildcard origin (`*`) with `Allow-Credentials: true`.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::CorsConfig;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Authorization, Content-Type";

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<HeaderValue>,
    wildcard: bool,
    max_age: HeaderValue,
}

impl CorsPolicy {
    pub fn new<I, S>(origins: I, max_age_seconds: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut wildcard = false;
        let allowed_origins = origins
            .into_iter()
            .filter_map(|origin| {
                let origin = origin.as_ref().trim();
                if origin == "*" {
                    wildcard = true;
                    return None;
                }
                HeaderValue::from_str(origin.trim_end_matches('/')).ok()
            })
            .collect();

        Self {
            allowed_origins,
            wildcard,
            max_age: HeaderValue::from(max_age_seconds),
        }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self::new(&config.allowed_origins, config.max_age_seconds)
    }

    /// Write the CORS headers for a response to a request carrying `origin`.
    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        let allow_origin = if self.wildcard {
            Some(HeaderValue::from_static("*"))
        } else {
            origin
                .filter(|o| self.allowed_origins.iter().any(|allowed| allowed == *o))
                .or_else(|| self.allowed_origins.first())
                .cloned()
        };

        if let Some(value) = allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        if !self.wildcard {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers.append(VARY, HeaderValue::from_static("origin"));
    }
}
