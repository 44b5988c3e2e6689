//! Rendering accounts for a role: stored columns plus derived values.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use adportal_auth::Role;
use adportal_core::{AccountId, UserId, VendorId, VpsId};
use adportal_hosts::{display_hosts, HostedAccount, Vps};
use adportal_vendors::{clients_allowed, Permission, Vendor};

use crate::account::Account;
use crate::attributes::{columns, AccessMode, Attribute};
use crate::budget::round2;
use crate::history::format_hk;
use crate::status::AccountStatus;

/// Read access to the records account screens join against.
pub trait AccountLookups {
    fn user_name(&self, id: UserId) -> Option<String>;

    fn vendor(&self, id: VendorId) -> Option<Vendor>;

    fn vendor_permissions(&self, vendor: VendorId) -> Vec<Permission>;

    fn hosts(&self, ids: &[VpsId]) -> Vec<Vps>;
}

/// Display value of one attribute.
pub fn display_value(account: &Account, attribute: Attribute, lookups: &impl AccountLookups) -> JsonValue {
    let fields = account.fields();
    let budget = account.budget();
    match attribute {
        Attribute::Client => fields
            .client_id
            .and_then(|id| lookups.user_name(id))
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        Attribute::ClientsAllowed => {
            let permissions = fields
                .vendor_id
                .map(|v| lookups.vendor_permissions(v))
                .unwrap_or_default();
            JsonValue::from(clients_allowed(fields.vendor_id, &permissions))
        }
        Attribute::Vendor => fields
            .vendor_id
            .and_then(|id| lookups.vendor(id))
            .map(|v| JsonValue::from(v.display_name()))
            .unwrap_or(JsonValue::Null),
        Attribute::DaysToTopup => fields
            .vendor_id
            .and_then(|id| lookups.vendor(id))
            .and_then(|v| v.days_to_topup)
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        Attribute::CreatedAt => account
            .created_at()
            .map(|at| JsonValue::from(format_hk(at)))
            .unwrap_or(JsonValue::Null),
        Attribute::PercentageSpent => option_number(budget.percentage_spent().map(round2)),
        Attribute::DaysLeft => JsonValue::from(budget.days_left()),
        Attribute::Spent => option_number(budget.spent().map(round2)),
        Attribute::SpentInHkd => JsonValue::from(round2(budget.spent_in_hkd())),
        Attribute::RemainingInHkd => option_number(budget.remaining_in_hkd().map(round2)),
        Attribute::Vpss => JsonValue::from(display_hosts(&lookups.hosts(&fields.vps_ids))),
        stored => account.get(stored).to_json(),
    }
}

fn option_number(value: Option<f64>) -> JsonValue {
    value.map(JsonValue::from).unwrap_or(JsonValue::Null)
}

/// One rendered account: column name → display value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub id: AccountId,
    pub values: Map<String, JsonValue>,
}

pub fn render_row(account: &Account, attributes: &[Attribute], lookups: &impl AccountLookups) -> AccountRow {
    let mut values = Map::new();
    for attribute in attributes {
        values.insert(attribute.name().to_string(), display_value(account, *attribute, lookups));
    }
    AccountRow {
        id: account.id_typed(),
        values,
    }
}

/// Columns plus rows, as a list screen shows them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTable {
    pub role: Role,
    pub columns: Vec<&'static str>,
    pub labels: Vec<&'static str>,
    pub list_editable: Vec<&'static str>,
    pub rows: Vec<AccountRow>,
}

pub fn render_table<'a>(
    role: Role,
    accounts: impl IntoIterator<Item = &'a Account>,
    lookups: &impl AccountLookups,
) -> AccountTable {
    let attributes = columns(AccessMode::ListRead, role);
    AccountTable {
        role,
        columns: attributes.iter().map(|a| a.name()).collect(),
        labels: attributes.iter().map(|a| a.label()).collect(),
        list_editable: columns(AccessMode::ListEdit, role).iter().map(|a| a.name()).collect(),
        rows: accounts
            .into_iter()
            .map(|a| render_row(a, attributes, lookups))
            .collect(),
    }
}

/// Detail screen: every readable column for the role.
pub fn render_detail(role: Role, account: &Account, lookups: &impl AccountLookups) -> AccountRow {
    render_row(account, columns(AccessMode::Read, role), lookups)
}

/// List screen filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountFilter {
    pub status: Option<AccountStatus>,
    /// Substring of adwords id, nickname or login (case-insensitive).
    pub q: Option<String>,
    /// Restrict to one client's accounts.
    pub client: Option<UserId>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        if !account.exists() {
            return false;
        }
        let fields = account.fields();
        if self.status.is_some_and(|s| s != fields.status) {
            return false;
        }
        if self.client.is_some_and(|c| fields.client_id != Some(c)) {
            return false;
        }
        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => {
                let needle = q.to_lowercase();
                let hit = |s: &str| s.to_lowercase().contains(&needle);
                hit(&fields.adwords_id)
                    || fields.nickname.as_deref().is_some_and(hit)
                    || fields.login.as_deref().is_some_and(hit)
            }
        }
    }
}

/// The accounts of `accounts` that run on `vps`, in the shape hosts need.
pub fn hosted_on<'a>(accounts: impl IntoIterator<Item = &'a Account>, vps: VpsId) -> Vec<HostedAccount<'a>> {
    accounts
        .into_iter()
        .filter(|a| a.exists() && a.fields().vps_ids.contains(&vps))
        .map(|a| HostedAccount {
            status: a.status().as_str(),
            is_dead: a.status().is_dead(),
            login: a.fields().login.as_deref(),
        })
        .collect()
}

/// Monitoring export entry for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringEntry {
    pub status: String,
    pub daily_budget_in_hkd: f64,
    pub spent_in_hkd: f64,
    pub login: Option<String>,
    pub vendor_nickname: Option<String>,
    pub vps: String,
}

pub fn monitoring_entry(account: &Account, lookups: &impl AccountLookups) -> MonitoringEntry {
    let fields = account.fields();
    MonitoringEntry {
        status: account.status().name(),
        daily_budget_in_hkd: round2(account.budget().daily_budget_in_hkd().unwrap_or(0.0)),
        spent_in_hkd: round2(account.budget().spent_in_hkd()),
        login: fields.login.clone(),
        vendor_nickname: fields
            .vendor_id
            .and_then(|id| lookups.vendor(id))
            .map(|v| v.nickname),
        vps: display_hosts(&lookups.hosts(&fields.vps_ids)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{BTreeMap, HashMap};

    use chrono::Utc;

    use super::*;
    use crate::account::{AccountCommand, CreateAccount};
    use crate::value::FieldValue;
    use adportal_core::{Aggregate, PermissionId};
    use adportal_hosts::VpsDraft;
    use adportal_vendors::{PermissionDraft, VendorDraft};

    #[derive(Default)]
    pub(crate) struct Fixture {
        pub users: HashMap<UserId, String>,
        pub vendors: HashMap<VendorId, Vendor>,
        pub permissions: Vec<Permission>,
        pub hosts: HashMap<VpsId, Vps>,
    }

    impl AccountLookups for Fixture {
        fn user_name(&self, id: UserId) -> Option<String> {
            self.users.get(&id).cloned()
        }

        fn vendor(&self, id: VendorId) -> Option<Vendor> {
            self.vendors.get(&id).cloned()
        }

        fn vendor_permissions(&self, vendor: VendorId) -> Vec<Permission> {
            self.permissions.iter().filter(|p| p.vendor_id == vendor).cloned().collect()
        }

        fn hosts(&self, ids: &[VpsId]) -> Vec<Vps> {
            ids.iter().filter_map(|id| self.hosts.get(id).cloned()).collect()
        }
    }

    impl Fixture {
        pub(crate) fn standard() -> Self {
            let now = Utc::now();
            let mut fx = Fixture::default();
            fx.users.insert(UserId::new(888), "whales".into());
            fx.vendors.insert(
                VendorId::new(1),
                Vendor::create(
                    VendorId::new(1),
                    VendorDraft {
                        nickname: "acme".into(),
                        company_name: "Acme Ltd".into(),
                        payments_profile_id: Some("1234-5678-9012".into()),
                        days_to_topup: Some(3),
                        is_active: true,
                        ..VendorDraft::default()
                    },
                    now,
                ),
            );
            for (id, user) in [(1, 888), (2, 889), (3, 890)] {
                fx.permissions.push(Permission::create(
                    PermissionId::new(id),
                    PermissionDraft {
                        vendor_id: VendorId::new(1),
                        user_id: UserId::new(user),
                        notes: None,
                    },
                    None,
                    now,
                ));
            }
            for (id, name, provider) in [(1, "hk-2", "Vultr"), (2, "hk-1", "Vultr")] {
                fx.hosts.insert(
                    VpsId::new(id),
                    Vps::create(
                        VpsId::new(id),
                        VpsDraft {
                            name: name.into(),
                            provider: provider.into(),
                            country: "HK".into(),
                            login: "administrator".into(),
                            password: "pw".into(),
                            ..VpsDraft::default()
                        },
                        now,
                    ),
                );
            }
            fx
        }
    }

    pub(crate) fn account_with(id: i64, values: Vec<(Attribute, FieldValue)>) -> Account {
        let mut account = Account::empty(AccountId::new(id));
        let values: BTreeMap<_, _> = values.into_iter().collect();
        let events = account
            .handle(&AccountCommand::Create(CreateAccount {
                account_id: AccountId::new(id),
                values,
                actor: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            account.apply(e);
        }
        account
    }

    fn sample() -> Account {
        account_with(
            1,
            vec![
                (Attribute::AdwordsId, FieldValue::Text("123-456-7890".into())),
                (Attribute::Nickname, FieldValue::Text("Shop A".into())),
                (Attribute::Login, FieldValue::Text("ops@example.com".into())),
                (Attribute::Status, FieldValue::Text("active".into())),
                (Attribute::ClientId, FieldValue::Id(888)),
                (Attribute::VendorId, FieldValue::Id(1)),
                (Attribute::Vpss, FieldValue::Ids(vec![1, 2])),
                (Attribute::AccountBudget, FieldValue::Number(1000.0)),
                (Attribute::AccountBudgetOverride, FieldValue::Number(1200.0)),
                (Attribute::RemainingAccountBudget, FieldValue::Number(400.0)),
                (Attribute::DailyBudget, FieldValue::Number(100.0)),
                (Attribute::ExchangeRate, FieldValue::Number(7.8)),
            ],
        )
    }

    #[test]
    fn list_columns_follow_the_resolver() {
        let fx = Fixture::standard();
        let account = sample();
        for role in Role::ALL {
            let table = render_table(role, [&account], &fx);
            let expected: Vec<_> = columns(AccessMode::ListRead, role).iter().map(|a| a.name()).collect();
            assert_eq!(table.columns, expected);
            let keys: Vec<_> = table.rows[0].values.keys().map(String::as_str).collect();
            let mut sorted = expected.clone();
            sorted.sort_unstable();
            assert_eq!(keys, sorted);
        }
    }

    #[test]
    fn derived_values_use_overrides_and_lookups() {
        let fx = Fixture::standard();
        let row = render_detail(Role::Admin, &sample(), &fx);
        let v = &row.values;
        assert_eq!(v["spent"], JsonValue::from(800.0));
        assert_eq!(v["spent_in_hkd"], JsonValue::from(6240.0));
        assert_eq!(v["days_left"], JsonValue::from(4));
        assert_eq!(v["client"], JsonValue::from("whales"));
        assert_eq!(v["vendor"], JsonValue::from("1234 Acme Ltd"));
        assert_eq!(v["days_to_topup"], JsonValue::from(3));
        assert_eq!(v["clients_allowed"], JsonValue::from("888-890"));
        assert_eq!(v["VPSs"], JsonValue::from("hk-1, hk-2"));
    }

    #[test]
    fn client_detail_hides_operational_columns() {
        let fx = Fixture::standard();
        let row = render_detail(Role::Client, &sample(), &fx);
        assert!(!row.values.contains_key("login"));
        assert!(!row.values.contains_key("client"));
        assert!(row.values.contains_key("clients_allowed"));
    }

    #[test]
    fn filters_by_status_query_and_client() {
        let account = sample();
        assert!(AccountFilter::default().matches(&account));
        assert!(AccountFilter { q: Some("SHOP".into()), ..Default::default() }.matches(&account));
        assert!(AccountFilter { q: Some("456-78".into()), ..Default::default() }.matches(&account));
        assert!(!AccountFilter { q: Some("zzz".into()), ..Default::default() }.matches(&account));
        assert!(!AccountFilter { status: Some(AccountStatus::Suspended), ..Default::default() }.matches(&account));
        assert!(AccountFilter { client: Some(UserId::new(888)), ..Default::default() }.matches(&account));
        assert!(!AccountFilter { client: Some(UserId::new(5)), ..Default::default() }.matches(&account));
    }

    #[test]
    fn monitoring_entry_rounds_money() {
        let fx = Fixture::standard();
        let entry = monitoring_entry(&sample(), &fx);
        assert_eq!(entry.status, "ACTIVE");
        assert_eq!(entry.daily_budget_in_hkd, 780.0);
        assert_eq!(entry.spent_in_hkd, 6240.0);
        assert_eq!(entry.vendor_nickname.as_deref(), Some("acme"));
        assert_eq!(entry.vps, "hk-1, hk-2");
    }

    #[test]
    fn hosted_accounts_for_a_vps() {
        let account = sample();
        let hosted = hosted_on([&account], VpsId::new(2));
        assert_eq!(hosted.len(), 1);
        assert_eq!(hosted[0].status, "active");
        assert!(hosted_on([&account], VpsId::new(9)).is_empty());
    }
}
