//! Privilege predicates for management routes.

use super::AuthError;
use crate::models::auth::Principal;

/// Privilege level a route may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Super-admin or system-admin.
    Admin,
    /// Static super-admin only.
    SuperAdmin,
}

impl Privilege {
    fn admits(&self, principal: &Principal) -> bool {
        match self {
            Privilege::Admin => principal.is_admin(),
            Privilege::SuperAdmin => principal.is_super_admin,
        }
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Privilege::Admin => f.write_str("administrator"),
            Privilege::SuperAdmin => f.write_str("super-administrator"),
        }
    }
}

/// Check a request's principal against a required privilege.
///
/// No principal is `Unauthenticated` (401); a principal without the flag is
/// `Forbidden` (403).
pub fn authorize(
    principal: Option<&Principal>,
    required: Privilege,
) -> Result<&Principal, AuthError> {
    let principal = principal.ok_or(AuthError::Unauthenticated)?;
    if required.admits(principal) {
        Ok(principal)
    } else {
        Err(AuthError::Forbidden(required))
    }
}
