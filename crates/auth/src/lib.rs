//! `adportal-auth` — authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: callers hand in headers, tokens and
//! stored hashes, and get back principals and decisions.

pub mod authorize;
pub mod basic;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, require_any, AuthzError, Screen};
pub use basic::{BasicCredentials, BasicAuthError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use password::{hash_password, verify_password, PasswordError};
pub use principal::{Principal, RoleAssignmentError};
pub use roles::{Role, UnknownRole};
pub use user::{NewUser, User, UserUpdate, UserView};
