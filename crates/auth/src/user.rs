//! Portal users: staff and clients.
//!
//! Users are plain records. Passwords are stored as Argon2 PHC strings and
//! never leave this module in clear or hashed form through [`UserView`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adportal_core::{DomainError, DomainResult, Entity, FieldErrors, UserId};

use crate::password::{hash_password, verify_password};
use crate::principal::{Principal, RoleAssignmentError};
use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub is_enabled: bool,
    pub roles: Vec<Role>,
    /// Link to the client's budget sheet.
    pub budget_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn create(id: UserId, draft: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        let password_hash =
            hash_password(&draft.password).map_err(|e| DomainError::invariant(e.to_string()))?;
        Ok(Self {
            id,
            username: draft.username.trim().to_string(),
            name: draft.name,
            password_hash,
            is_enabled: draft.is_enabled,
            roles: draft.roles,
            budget_url: draft.budget_url,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, update: UserUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        update.validate()?;
        if let Some(password) = &update.password {
            self.password_hash =
                hash_password(password).map_err(|e| DomainError::invariant(e.to_string()))?;
        }
        if let Some(name) = update.name {
            self.name = Some(name).filter(|n| !n.trim().is_empty());
        }
        if let Some(is_enabled) = update.is_enabled {
            self.is_enabled = is_enabled;
        }
        if let Some(roles) = update.roles {
            self.roles = roles;
        }
        if let Some(budget_url) = update.budget_url {
            self.budget_url = Some(budget_url).filter(|u| !u.trim().is_empty());
        }
        self.updated_at = now;
        Ok(())
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn check_password(&self, password: &str) -> bool {
        match verify_password(password, &self.password_hash) {
            Ok(ok) => ok,
            Err(err) => {
                tracing::warn!(user_id = %self.id, error = %err, "stored password hash rejected");
                false
            }
        }
    }

    pub fn principal(&self) -> Result<Principal, RoleAssignmentError> {
        Principal::from_assigned_roles(self.id, &self.roles)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Name shown next to account rows and history entries.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            is_enabled: self.is_enabled,
            roles: self.roles.clone(),
            budget_url: self.budget_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub budget_url: Option<String>,
}

fn enabled() -> bool {
    true
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", "This field is required.");
        }
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        if has_duplicates(&self.roles) {
            errors.add("roles", "Roles must not repeat.");
        }
        errors.into_result()
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub budget_url: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if self.password.as_deref().is_some_and(str::is_empty) {
            errors.add("password", "Password cannot be blank.");
        }
        if self.roles.as_deref().is_some_and(has_duplicates) {
            errors.add("roles", "Roles must not repeat.");
        }
        errors.into_result()
    }
}

fn has_duplicates(roles: &[Role]) -> bool {
    roles.iter().enumerate().any(|(i, r)| roles[..i].contains(r))
}

/// What the API returns for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub is_enabled: bool,
    pub roles: Vec<Role>,
    pub budget_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(roles: Vec<Role>) -> NewUser {
        NewUser {
            username: "alice".into(),
            password: "s3cret".into(),
            name: Some("Alice".into()),
            is_enabled: true,
            roles,
            budget_url: None,
        }
    }

    #[test]
    fn create_hashes_password() {
        let user = User::create(UserId::new(1), new_user(vec![Role::Client]), Utc::now()).unwrap();
        assert_ne!(user.password_hash, "s3cret");
        assert!(user.check_password("s3cret"));
        assert!(!user.check_password("wrong"));
    }

    #[test]
    fn principal_requires_exactly_one_role() {
        let now = Utc::now();
        let one = User::create(UserId::new(1), new_user(vec![Role::Support]), now).unwrap();
        assert_eq!(one.principal().unwrap().role, Role::Support);

        let none = User::create(UserId::new(2), new_user(vec![]), now).unwrap();
        assert_eq!(none.principal(), Err(RoleAssignmentError::NoRole));

        let two = User::create(UserId::new(3), new_user(vec![Role::Admin, Role::Client]), now).unwrap();
        assert_eq!(two.principal(), Err(RoleAssignmentError::MultipleRoles(2)));
    }

    #[test]
    fn duplicate_roles_are_rejected() {
        let err = User::create(UserId::new(1), new_user(vec![Role::Admin, Role::Admin]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Fields(_)));
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut user = User::create(UserId::new(1), new_user(vec![Role::Client]), Utc::now()).unwrap();
        let hash = user.password_hash.clone();
        user.update(
            UserUpdate {
                is_enabled: Some(false),
                budget_url: Some("https://sheets.example/1".into()),
                ..UserUpdate::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert!(!user.is_enabled);
        assert_eq!(user.password_hash, hash);
        assert_eq!(user.display_name(), "Alice");
        assert_eq!(user.view().budget_url.as_deref(), Some("https://sheets.example/1"));

        user.update(UserUpdate { password: Some("new".into()), ..UserUpdate::default() }, Utc::now())
            .unwrap();
        assert!(user.check_password("new"));
    }
}
