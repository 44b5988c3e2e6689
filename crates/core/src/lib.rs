//! `adportal-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldErrors};
pub use id::{
    AccessId, AccountId, AggregateId, BankAccountId, PermissionId, TransferId, UserId, VendorId,
    VpsId,
};
