use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: admin role required")]
    AdminRequired,
}

/// Admin-only gate for the management surface.
pub fn require_admin(role: Role) -> Result<(), AuthzError> {
    if role.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}
