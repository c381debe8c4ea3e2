use gadgetbazar_auth::{Role, User};
use gadgetbazar_core::UserId;

/// The authenticated caller, resolved to a local user record.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    user: User,
}

impl CallerContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}
