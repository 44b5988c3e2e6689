use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adportal_core::{BankAccountId, DomainResult, Entity, FieldErrors};

use crate::transfer::Transfer;

/// A bank account owned by one or more vendors; transfers go to or from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub name: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankAccountDraft {
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl BankAccountDraft {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "This field is required.");
        }
        errors.into_result()
    }
}

impl BankAccount {
    pub fn create(id: BankAccountId, draft: BankAccountDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            details: draft.details,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, draft: BankAccountDraft, now: DateTime<Utc>) {
        self.name = draft.name.trim().to_string();
        self.details = draft.details;
        self.updated_at = now;
    }
}

impl Entity for BankAccount {
    type Id = BankAccountId;

    fn id(&self) -> BankAccountId {
        self.id
    }
}

/// HKD figures of one account belonging to a linked vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountFigures {
    pub spent_in_hkd: f64,
    pub remaining_in_hkd: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BankAccountTotals {
    pub transfer_count: usize,
    pub total_sent_in_hkd: f64,
    pub total_spent_in_hkd: f64,
    pub total_remaining_in_hkd: f64,
    pub total_outstanding_in_hkd: f64,
}

impl BankAccountTotals {
    /// `transfers` are the bank account's own; `accounts` are all accounts
    /// of the vendors linked to it.
    pub fn compute<'a>(
        transfers: impl IntoIterator<Item = &'a Transfer>,
        accounts: impl IntoIterator<Item = AccountFigures>,
    ) -> Self {
        let mut totals = Self::default();
        for transfer in transfers {
            totals.transfer_count += 1;
            totals.total_sent_in_hkd += transfer.net_in_hkd().unwrap_or(0.0);
        }
        for account in accounts {
            totals.total_spent_in_hkd += account.spent_in_hkd;
            totals.total_remaining_in_hkd += account.remaining_in_hkd.unwrap_or(0.0);
        }
        totals.total_outstanding_in_hkd =
            totals.total_sent_in_hkd - totals.total_spent_in_hkd - totals.total_remaining_in_hkd;
        totals
    }
}
