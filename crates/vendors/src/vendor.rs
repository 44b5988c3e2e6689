use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use adportal_core::{BankAccountId, DomainResult, Entity, FieldErrors, VendorId};

static PROFILE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{4}-[0-9]{4}$").expect("static regex is valid"));
static PAYMENTS_ACCOUNT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{4}$").expect("static regex is valid"));

/// An external party supplying advertising accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub nickname: String,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub payments_account_id: Option<String>,
    pub payments_profile_id: Option<String>,
    pub notes: Option<String>,
    pub bank_account_id: Option<BankAccountId>,
    pub is_active: bool,
    pub days_to_topup: Option<i32>,
    /// Percentage withheld by the vendor on top-ups (0..=100).
    pub service_fee: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/edit payload for a vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorDraft {
    pub nickname: String,
    pub company_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub payments_account_id: Option<String>,
    #[serde(default)]
    pub payments_profile_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub bank_account_id: Option<BankAccountId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub days_to_topup: Option<i32>,
    #[serde(default)]
    pub service_fee: Option<f64>,
}

fn default_active() -> bool {
    true
}

impl VendorDraft {
    /// Field-level checks that need no other records.
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if self.nickname.trim().is_empty() {
            errors.add("nickname", "This field is required.");
        }
        if self.company_name.trim().is_empty() {
            errors.add("company_name", "This field is required.");
        }
        if let Some(id) = non_empty(&self.payments_profile_id) {
            if !PROFILE_ID.is_match(id) {
                errors.add("payments_profile_id", "ID must be in the format of 1234-1234-1234.");
            }
        }
        if let Some(id) = non_empty(&self.payments_account_id) {
            if !PAYMENTS_ACCOUNT_ID.is_match(id) {
                errors.add("payments_account_id", "ID must be in the format of 1234-1234-1234-1234");
            }
        }
        if let Some(fee) = self.service_fee {
            if !(0.0..=100.0).contains(&fee) {
                errors.add("service_fee", "Number must be between 0 and 100.");
            }
        }
        if let Some(days) = self.days_to_topup {
            if days < 0 {
                errors.add("days_to_topup", "Number must be at least 0.");
            }
        }
        errors.into_result()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Vendor {
    pub fn create(id: VendorId, draft: VendorDraft, now: DateTime<Utc>) -> Self {
        let mut vendor = Self {
            id,
            nickname: String::new(),
            company_name: String::new(),
            contact_name: None,
            payments_account_id: None,
            payments_profile_id: None,
            notes: None,
            bank_account_id: None,
            is_active: true,
            days_to_topup: None,
            service_fee: None,
            created_at: now,
            updated_at: now,
        };
        vendor.update(draft, now);
        vendor
    }

    pub fn update(&mut self, draft: VendorDraft, now: DateTime<Utc>) {
        self.nickname = draft.nickname.trim().to_string();
        self.company_name = draft.company_name.trim().to_string();
        self.contact_name = draft.contact_name;
        self.payments_account_id = non_empty(&draft.payments_account_id).map(str::to_string);
        self.payments_profile_id = non_empty(&draft.payments_profile_id).map(str::to_string);
        self.notes = draft.notes;
        self.bank_account_id = draft.bank_account_id;
        self.is_active = draft.is_active;
        self.days_to_topup = draft.days_to_topup;
        self.service_fee = draft.service_fee;
        self.updated_at = now;
    }

    /// `"1234 Company Ltd"`: profile prefix then company name.
    pub fn display_name(&self) -> String {
        match self.payments_profile_id.as_deref() {
            Some(profile) => {
                let prefix: String = profile.chars().take(4).collect();
                format!("{prefix} {}", self.company_name)
            }
            None => self.company_name.clone(),
        }
    }

    pub fn has_bank_account(&self) -> bool {
        self.bank_account_id.is_some()
    }
}

impl Entity for Vendor {
    type Id = VendorId;

    fn id(&self) -> VendorId {
        self.id
    }
}

/// Account counts and spend for one vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VendorTotals {
    pub num_accounts_total: usize,
    pub num_accounts_unused: usize,
    pub num_accounts_used: usize,
    pub total_spent_in_hkd: f64,
    pub has_bank_account: bool,
}

impl VendorTotals {
    /// Tally `(activated, spent_in_hkd)` pairs of the vendor's accounts.
    pub fn tally(vendor: &Vendor, accounts: impl IntoIterator<Item = (bool, f64)>) -> Self {
        let mut totals = Self {
            has_bank_account: vendor.has_bank_account(),
            ..Self::default()
        };
        for (activated, spent) in accounts {
            totals.num_accounts_total += 1;
            if !activated {
                totals.num_accounts_unused += 1;
            }
            totals.total_spent_in_hkd += spent;
        }
        totals.num_accounts_used = totals.num_accounts_total - totals.num_accounts_unused;
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_core::DomainError;

    fn draft() -> VendorDraft {
        VendorDraft {
            nickname: "acme".into(),
            company_name: "Acme Ltd".into(),
            payments_profile_id: Some("1234-5678-9012".into()),
            payments_account_id: Some("1111-2222-3333-4444".into()),
            service_fee: Some(5.0),
            is_active: true,
            ..VendorDraft::default()
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(draft().validate(), Ok(()));
    }

    #[test]
    fn rejects_malformed_ids_and_fee() {
        let bad = VendorDraft {
            payments_profile_id: Some("1234-5678".into()),
            payments_account_id: Some("1111-2222-3333".into()),
            service_fee: Some(101.0),
            ..draft()
        };
        let Err(DomainError::Fields(errors)) = bad.validate() else {
            panic!("expected field errors");
        };
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["payments_account_id", "payments_profile_id", "service_fee"]
        );
    }

    #[test]
    fn blank_optional_ids_are_allowed() {
        let d = VendorDraft {
            payments_profile_id: Some("  ".into()),
            payments_account_id: None,
            ..draft()
        };
        assert_eq!(d.validate(), Ok(()));
        let v = Vendor::create(VendorId::new(1), d, Utc::now());
        assert_eq!(v.payments_profile_id, None);
        assert_eq!(v.display_name(), "Acme Ltd");
    }

    #[test]
    fn display_name_uses_profile_prefix() {
        let v = Vendor::create(VendorId::new(1), draft(), Utc::now());
        assert_eq!(v.display_name(), "1234 Acme Ltd");
    }

    #[test]
    fn totals_split_used_and_unused() {
        let v = Vendor::create(VendorId::new(1), draft(), Utc::now());
        let totals = VendorTotals::tally(&v, [(true, 10.0), (false, 0.0), (true, 2.5)]);
        assert_eq!(totals.num_accounts_total, 3);
        assert_eq!(totals.num_accounts_unused, 1);
        assert_eq!(totals.num_accounts_used, 2);
        assert_eq!(totals.total_spent_in_hkd, 12.5);
        assert!(!totals.has_bank_account);
    }
}
