use thiserror::Error;

use crate::{Principal, UserId};

/// Declarative policy for a protected operation.
///
/// - `require_admin`: the principal's role must be admin.
/// - `require_ownership`: the principal must be the resource's own user,
///   unless the principal is an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    pub require_admin: bool,
    pub require_ownership: bool,
}

impl Policy {
    /// Authenticated access only; no role or ownership requirement.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self {
            require_admin: true,
            require_ownership: false,
        }
    }

    pub fn ownership() -> Self {
        Self {
            require_admin: false,
            require_ownership: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
}

/// Authorize a verified principal against a policy.
///
/// - No IO
/// - No panics
/// - Pure decision: `(principal, resource, policy)` in, allow/deny out
///
/// `resource` is the user id embedded in the request path, when there is one;
/// ownership policies on routes without a resource id reject outright rather
/// than guessing.
pub fn authorize(
    principal: &Principal,
    resource: Option<UserId>,
    policy: &Policy,
) -> Result<(), GuardError> {
    if policy.require_admin && !principal.role.is_admin() {
        return Err(GuardError::Forbidden("admin access required"));
    }

    if policy.require_ownership && !principal.role.is_admin() {
        match resource {
            Some(id) if id == principal.id => {}
            _ => {
                return Err(GuardError::Forbidden(
                    "you can only access your own resources",
                ));
            }
        }
    }

    Ok(())
}
