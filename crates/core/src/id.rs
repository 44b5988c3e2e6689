//! Strongly-typed identifiers used across the domain.
//!
//! Records are keyed by serial integers (allocated by the owning store), so ids
//! order naturally and can be rendered as compact ranges.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! serial_ids {
    ($($(#[$doc:meta])* $t:ident => $name:literal;)+) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $t(i64);

            impl $t {
                pub const fn new(value: i64) -> Self {
                    Self(value)
                }

                pub const fn get(self) -> i64 {
                    self.0
                }
            }

            impl core::fmt::Display for $t {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    core::fmt::Display::fmt(&self.0, f)
                }
            }

            impl From<i64> for $t {
                fn from(value: i64) -> Self {
                    Self(value)
                }
            }

            impl From<$t> for i64 {
                fn from(value: $t) -> Self {
                    value.0
                }
            }

            impl FromStr for $t {
                type Err = DomainError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let value = s
                        .trim()
                        .parse::<i64>()
                        .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                    if value <= 0 {
                        return Err(DomainError::invalid_id(format!("{}: must be positive", $name)));
                    }
                    Ok(Self(value))
                }
            }
        )+
    };
}

serial_ids! {
    /// Identifier of an event-sourced stream.
    AggregateId => "AggregateId";
    /// Identifier of a portal user (staff or client).
    UserId => "UserId";
    /// Identifier of an advertising account.
    AccountId => "AccountId";
    VendorId => "VendorId";
    VpsId => "VpsId";
    BankAccountId => "BankAccountId";
    TransferId => "TransferId";
    PermissionId => "PermissionId";
    AccessId => "AccessId";
}

impl AccountId {
    /// Accounts are event-sourced; their stream shares the account's serial id.
    pub fn aggregate_id(self) -> AggregateId {
        AggregateId(self.0)
    }
}

impl From<AggregateId> for AccountId {
    fn from(value: AggregateId) -> Self {
        Self(value.0)
    }
}
