//! Vendors, their payment plumbing, and client access grants.
//!
//! Plain records (no event sourcing): each type carries its own form
//! validation and the derived figures its screens show.

pub mod bank_account;
pub mod permission;
pub mod transfer;
pub mod vendor;

pub use bank_account::{AccountFigures, BankAccount, BankAccountDraft, BankAccountTotals};
pub use permission::{clients_allowed, format_ranges, is_granted, plan_batch, BatchPlan, Permission, PermissionDraft};
pub use transfer::{SuggestedAmount, SuggestedNet, Transfer, TransferDraft};
pub use vendor::{Vendor, VendorDraft, VendorTotals};
