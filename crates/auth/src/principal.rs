use serde::Serialize;
use thiserror::Error;

use adportal_core::UserId;

use crate::Role;

/// An authenticated user acting with their single role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleAssignmentError {
    #[error("user has no role assigned")]
    NoRole,

    #[error("user has {0} roles assigned; exactly one is supported")]
    MultipleRoles(usize),
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Resolve a principal from a user's stored role assignment.
    ///
    /// Exactly one role per user is required; this is checked once at login so
    /// nothing downstream has to handle zero or several roles.
    pub fn from_assigned_roles(user_id: UserId, roles: &[Role]) -> Result<Self, RoleAssignmentError> {
        match roles {
            [] => Err(RoleAssignmentError::NoRole),
            [role] => Ok(Self::new(user_id, *role)),
            many => Err(RoleAssignmentError::MultipleRoles(many.len())),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_role_is_accepted() {
        let p = Principal::from_assigned_roles(UserId::new(3), &[Role::Support]).unwrap();
        assert_eq!(p.role, Role::Support);
        assert!(!p.is_admin());
    }

    #[test]
    fn zero_or_many_roles_are_rejected() {
        assert_eq!(
            Principal::from_assigned_roles(UserId::new(3), &[]),
            Err(RoleAssignmentError::NoRole)
        );
        assert_eq!(
            Principal::from_assigned_roles(UserId::new(3), &[Role::Admin, Role::Client]),
            Err(RoleAssignmentError::MultipleRoles(2))
        );
    }
}
