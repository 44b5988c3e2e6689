use serde::Serialize;
use thiserror::Error;

use crate::{Principal, Role};

/// A screen (resource family) of the admin surface, gated per role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "screen", content = "role", rename_all = "snake_case")]
pub enum Screen {
    /// The account screen rendered with a given role's columns.
    AccountView(Role),
    AccountLookup,
    Vendors,
    BankAccounts,
    Transfers,
    Hosts,
    Users,
    Permissions,
    AccessLog,
}

impl Screen {
    pub const STATIC: [Screen; 8] = [
        Screen::AccountLookup,
        Screen::Vendors,
        Screen::BankAccounts,
        Screen::Transfers,
        Screen::Hosts,
        Screen::Users,
        Screen::Permissions,
        Screen::AccessLog,
    ];

    /// Roles that may open this screen. Admin may open every account view.
    pub fn allows(self, role: Role) -> bool {
        match self {
            Screen::AccountView(view) => role == view || role == Role::Admin,
            _ => role == Role::Admin,
        }
    }

    pub fn name(self) -> String {
        match self {
            Screen::AccountView(role) => format!("accounts.{role}"),
            Screen::AccountLookup => "accounts.lookup".to_string(),
            Screen::Vendors => "vendors".to_string(),
            Screen::BankAccounts => "bank_accounts".to_string(),
            Screen::Transfers => "transfers".to_string(),
            Screen::Hosts => "vps".to_string(),
            Screen::Users => "users".to_string(),
            Screen::Permissions => "permissions".to_string(),
            Screen::AccessLog => "accesses".to_string(),
        }
    }

    /// Every screen the role can open (for navigation menus).
    pub fn accessible_to(role: Role) -> Vec<Screen> {
        Role::ALL
            .into_iter()
            .map(Screen::AccountView)
            .chain(Screen::STATIC)
            .filter(|s| s.allows(role))
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' cannot access '{screen}'")]
    Forbidden { role: Role, screen: String },

    #[error("forbidden: requires one of {0:?}")]
    RoleRequired(Vec<Role>),
}

/// Authorize a principal for a screen.
pub fn authorize(principal: &Principal, screen: Screen) -> Result<(), AuthzError> {
    if screen.allows(principal.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role,
            screen: screen.name(),
        })
    }
}

/// Authorize against an explicit role list (widgets, dashboards).
pub fn require_any(principal: &Principal, roles: &[Role]) -> Result<(), AuthzError> {
    if roles.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthzError::RoleRequired(roles.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_core::UserId;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(1), role)
    }

    #[test]
    fn account_views_open_to_own_role_and_admin() {
        for view in Role::ALL {
            for role in Role::ALL {
                let allowed = authorize(&principal(role), Screen::AccountView(view)).is_ok();
                assert_eq!(allowed, role == view || role == Role::Admin, "{role} on {view}");
            }
        }
    }

    #[test]
    fn back_office_screens_are_admin_only() {
        for screen in Screen::STATIC {
            assert!(authorize(&principal(Role::Admin), screen).is_ok());
            assert!(authorize(&principal(Role::Technician), screen).is_err());
            assert!(authorize(&principal(Role::Client), screen).is_err());
        }
    }

    #[test]
    fn accessible_screens_for_client() {
        assert_eq!(Screen::accessible_to(Role::Client), vec![Screen::AccountView(Role::Client)]);
        assert_eq!(Screen::accessible_to(Role::Admin).len(), 12);
    }

    #[test]
    fn require_any_checks_membership() {
        assert!(require_any(&principal(Role::Support), &[Role::Admin, Role::Support]).is_ok());
        assert!(require_any(&principal(Role::Client), &[Role::Admin]).is_err());
    }
}
