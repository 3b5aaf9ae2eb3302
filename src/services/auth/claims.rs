use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::services::auth::verifier::VerificationError;

/// Identity facts recovered from a credential.
///
/// Only verifiers in this module construct `Claims`, so holding one means the
/// credential it came from was verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    subject: String,
    email: Option<String>,
    role: String,
    issued_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

impl Claims {
    pub(crate) fn from_unix(
        subject: String,
        email: Option<String>,
        role: Option<String>,
        default_role: &str,
        issued_at: Option<i64>,
        expires_at: i64,
    ) -> Result<Self, VerificationError> {
        if subject.trim().is_empty() {
            return Err(VerificationError::Rejected("empty 'sub'".into()));
        }

        let expires_at = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .ok_or_else(|| VerificationError::Rejected("invalid 'exp'".into()))?;

        let issued_at = match issued_at {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| VerificationError::Rejected("invalid 'iat'".into()))?,
            ),
            None => None,
        };

        let role = role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| default_role.to_string());

        Ok(Self {
            subject,
            email: email.filter(|e| !e.trim().is_empty()),
            role,
            issued_at,
            expires_at,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
