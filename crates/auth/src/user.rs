//! User directory record.
//!
//! Users are created lazily on first authenticated request and reconciled
//! against each later token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadgetbazar_core::UserId;

use crate::{Role, VerifiedIdentity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Subject from the identity provider.
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_identity(identity: &VerifiedIdentity, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: Some(identity.default_display_name()),
            role: if identity.is_admin_auth() {
                Role::Admin
            } else {
                Role::Customer
            },
            created_at: now,
        }
    }

    /// Fold a fresh identity into an existing record. Returns whether anything changed.
    ///
    /// Admin-issuer tokens promote to admin; nothing here ever demotes. A missing
    /// display name is filled from the token name.
    pub fn reconcile(&mut self, identity: &VerifiedIdentity) -> bool {
        let mut changed = false;
        if identity.is_admin_auth() && self.role != Role::Admin {
            self.role = Role::Admin;
            changed = true;
        }
        let blank = self.display_name.as_deref().is_none_or(|n| n.trim().is_empty());
        if blank {
            if let Some(name) = identity.name.as_deref().filter(|n| !n.trim().is_empty()) {
                self.display_name = Some(name.to_string());
                changed = true;
            }
        }
        changed
    }

    /// How the user is named in admin-facing messages.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Issuer;

    fn identity(issuer: Issuer, name: Option<&str>) -> VerifiedIdentity {
        VerifiedIdentity {
            uid: "uid-9".to_string(),
            email: "farhana@example.com".to_string(),
            name: name.map(str::to_string),
            issuer,
        }
    }

    #[test]
    fn new_user_role_follows_issuer() {
        let u = User::from_identity(&identity(Issuer::Customer, None), Utc::now());
        assert_eq!(u.role, Role::Customer);
        assert_eq!(u.display_name.as_deref(), Some("farhana"));

        let a = User::from_identity(&identity(Issuer::Admin, Some("Farhana")), Utc::now());
        assert_eq!(a.role, Role::Admin);
        assert_eq!(a.label(), "Farhana");
    }

    #[test]
    fn reconcile_promotes_but_never_demotes() {
        let mut u = User::from_identity(&identity(Issuer::Customer, None), Utc::now());
        assert!(u.reconcile(&identity(Issuer::Admin, None)));
        assert_eq!(u.role, Role::Admin);
        assert!(!u.reconcile(&identity(Issuer::Customer, None)));
        assert_eq!(u.role, Role::Admin);
    }

    #[test]
    fn reconcile_fills_missing_display_name() {
        let mut u = User::from_identity(&identity(Issuer::Customer, None), Utc::now());
        u.display_name = None;
        assert_eq!(u.label(), "farhana@example.com");
        assert!(u.reconcile(&identity(Issuer::Customer, Some("Farhana Akter"))));
        assert_eq!(u.label(), "Farhana Akter");
    }
}
