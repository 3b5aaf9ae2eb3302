//! Static route policy: which paths are public and which roles a protected path requires.
//!
//! The table is built once from `Config` at startup and shared read-only (`Arc<RoutePolicy>`).
//! Classification is pure string matching, so it runs fresh on every request.

use std::collections::BTreeSet;
use std::fmt;

use axum::http::Method;

/// Result of classifying an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    /// Authentication required. An empty set means any authenticated role qualifies.
    Protected { required_roles: BTreeSet<String> },
}

/// One `[METHOD ]prefix=role|role` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRule {
    pub method: Option<Method>,
    pub prefix: String,
    pub roles: BTreeSet<String>,
}

impl RoleRule {
    pub fn new<I, R>(method: Option<Method>, prefix: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            method,
            prefix: normalize_prefix(prefix),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        if let Some(expected) = &self.method
            && expected != method
        {
            return false;
        }
        prefix_matches(&self.prefix, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyParseError {
    pub entry: String,
    pub reason: &'static str,
}

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role rule '{}': {}", self.entry, self.reason)
    }
}

impl std::error::Error for PolicyParseError {}

#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    public_prefixes: Vec<String>,
    role_rules: Vec<RoleRule>,
}

impl RoutePolicy {
    pub fn new<I, P>(public_prefixes: I, role_rules: Vec<RoleRule>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self {
            public_prefixes: public_prefixes
                .into_iter()
                .map(|p| normalize_prefix(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
            role_rules,
        }
    }

    /// Public prefixes win over role rules; among role rules the first match wins.
    pub fn classify(&self, method: &Method, path: &str) -> RouteClass {
        if self
            .public_prefixes
            .iter()
            .any(|prefix| prefix_matches(prefix, path))
        {
            return RouteClass::Public;
        }

        let required_roles = self
            .role_rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.roles.clone())
            .unwrap_or_default();

        RouteClass::Protected { required_roles }
    }

    /// Parse `AUTH_ROLE_RULES`.
    ///
    /// Format: entries separated by `;`, each `[METHOD ]prefix=role[|role...]`.
    /// Ex: `DELETE /api/v1/personas=admin;/api/v1/admin=admin|programador`
    pub fn parse_rules(raw: &str) -> Result<Vec<RoleRule>, PolicyParseError> {
        raw.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_rule)
            .collect()
    }
}

fn parse_rule(entry: &str) -> Result<RoleRule, PolicyParseError> {
    let err = |reason| PolicyParseError {
        entry: entry.to_string(),
        reason,
    };

    let (target, roles) = entry.split_once('=').ok_or_else(|| err("missing '='"))?;

    let roles: BTreeSet<String> = roles
        .split('|')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    if roles.is_empty() {
        return Err(err("no roles"));
    }

    let target = target.trim();
    let (method, prefix) = match target.split_once(char::is_whitespace) {
        Some((method, prefix)) => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| err("invalid method"))?;
            (Some(method), prefix.trim())
        }
        None => (None, target),
    };

    if !prefix.starts_with('/') {
        return Err(err("prefix must start with '/'"));
    }

    Ok(RoleRule {
        method,
        prefix: normalize_prefix(prefix),
        roles,
    })
}

// "/api/v1/auth/" -> "/api/v1/auth"; the root stays "/".
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim();
    if trimmed == "/" {
        return trimmed.to_string();
    }
    trimmed.trim_end_matches('/').to_string()
}

// Segment-aware: "/api/auth" matches "/api/auth" and "/api/auth/login" but not "/api/authors".
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
