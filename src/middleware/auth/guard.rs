//! Role authorization: second stage, after identity is established.

use std::collections::BTreeSet;

use crate::api::v1::extractors::IdentityContext;
use crate::services::auth::AuthError;

/// Empty `required_roles` admits every authenticated identity; otherwise the
/// identity's role must be in the set (exact, case-sensitive).
pub fn authorize(
    identity: &IdentityContext,
    required_roles: &BTreeSet<String>,
) -> Result<(), AuthError> {
    if required_roles.is_empty() || required_roles.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}
