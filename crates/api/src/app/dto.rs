//! Request bodies and response shapes that are not domain types themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use adportal_accounts::{round2, Account};
use adportal_auth::Role;
use adportal_core::{AccountId, UserId};
use adportal_hosts::{StatusTally, Vps};
use adportal_vendors::{BankAccount, BankAccountTotals, SuggestedNet, Transfer, Vendor, VendorTotals};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchUploadRequest {
    pub rows: Vec<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
pub struct RecordAccessRequest {
    pub account_id: AccountId,
}

/// One checked pair of a permission batch; `id` is the user or vendor id
/// depending on the scope.
#[derive(Debug, Deserialize)]
pub struct CheckedGrant {
    pub id: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionBatchRequest {
    #[serde(default)]
    pub checked: Vec<CheckedGrant>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PermissionListQuery {
    #[serde(default)]
    pub vendor_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Payload pushed by the ingestion job. Records stay untyped until each one
/// is read on its own, so one malformed record cannot sink the batch.
#[derive(Debug, Default, Deserialize)]
pub struct IngestionPayload {
    #[serde(default)]
    pub response: Vec<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionRecord {
    pub adwords_id: String,
    pub account_budget: String,
    pub remaining_account_budget: String,
    pub daily_budget: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub role: Role,
    pub user_id: UserId,
}

/// Compact account shape used by the widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub adwords_id: String,
    pub nickname: Option<String>,
    pub status: String,
    pub login: Option<String>,
    pub spent_in_hkd: f64,
    pub remaining_in_hkd: Option<f64>,
    pub daily_budget_in_hkd: Option<f64>,
    pub days_left: i64,
    pub last_visited_by_eve: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        let fields = account.fields();
        let budget = account.budget();
        Self {
            id: account.id_typed(),
            adwords_id: fields.adwords_id.clone(),
            nickname: fields.nickname.clone(),
            status: account.status().label().to_string(),
            login: fields.login.clone(),
            spent_in_hkd: round2(budget.spent_in_hkd()),
            remaining_in_hkd: budget.remaining_in_hkd().map(round2),
            daily_budget_in_hkd: budget.daily_budget_in_hkd().map(round2),
            days_left: budget.days_left(),
            last_visited_by_eve: fields.last_visited_by_eve,
        }
    }
}

pub fn summaries<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Vec<AccountSummary> {
    accounts.into_iter().map(AccountSummary::from).collect()
}

#[derive(Debug, Serialize)]
pub struct VendorView {
    #[serde(flatten)]
    pub vendor: Vendor,
    pub display_name: String,
    #[serde(flatten)]
    pub totals: VendorTotals,
}

#[derive(Debug, Serialize)]
pub struct BankAccountView {
    #[serde(flatten)]
    pub bank_account: BankAccount,
    #[serde(flatten)]
    pub totals: BankAccountTotals,
}

#[derive(Debug, Serialize)]
pub struct TransferView {
    #[serde(flatten)]
    pub transfer: Transfer,
    pub net_in_hkd: Option<f64>,
    pub suggested_net: SuggestedNet,
    /// `suggested_net` as the list cell shows it.
    pub suggested_net_display: String,
}

#[derive(Debug, Serialize)]
pub struct VpsView {
    #[serde(flatten)]
    pub vps: Vps,
    pub account_count: usize,
    pub alive_count: usize,
    pub alive_statuses: StatusTally,
    pub dead_statuses: StatusTally,
}
