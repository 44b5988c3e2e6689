//! Per-role attribute visibility.
//!
//! A static table describes every account attribute: display priority, label,
//! which roles may read or edit it, and how it behaves in list views. The
//! resolver derives ordered column lists per `(AccessMode, Role)` once and
//! serves them from a process-wide table afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use adportal_auth::Role;

/// Every attribute an account screen can show, stored or derived.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    #[serde(rename = "adwords_id")]
    AdwordsId,
    #[serde(rename = "nickname")]
    Nickname,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "last_visited_by_eve")]
    LastVisitedByEve,
    #[serde(rename = "client_id")]
    ClientId,
    #[serde(rename = "client")]
    Client,
    #[serde(rename = "clients_allowed")]
    ClientsAllowed,
    #[serde(rename = "auto_tag_on")]
    AutoTagOn,
    #[serde(rename = "is_unlimited")]
    IsUnlimited,
    #[serde(rename = "created_at")]
    CreatedAt,
    #[serde(rename = "account_budget")]
    AccountBudget,
    #[serde(rename = "account_budget_override")]
    AccountBudgetOverride,
    #[serde(rename = "remaining_account_budget")]
    RemainingAccountBudget,
    #[serde(rename = "remaining_account_budget_override")]
    RemainingAccountBudgetOverride,
    #[serde(rename = "daily_budget")]
    DailyBudget,
    #[serde(rename = "percentage_spent")]
    PercentageSpent,
    #[serde(rename = "days_left")]
    DaysLeft,
    #[serde(rename = "currency")]
    Currency,
    #[serde(rename = "exchange_rate")]
    ExchangeRate,
    #[serde(rename = "spent")]
    Spent,
    #[serde(rename = "spent_in_hkd")]
    SpentInHkd,
    #[serde(rename = "remaining_in_hkd")]
    RemainingInHkd,
    #[serde(rename = "vendor_id")]
    VendorId,
    #[serde(rename = "vendor")]
    Vendor,
    #[serde(rename = "days_to_topup")]
    DaysToTopup,
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "VPSs")]
    Vpss,
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "external_comment")]
    ExternalComment,
    #[serde(rename = "internal_comment")]
    InternalComment,
}

/// Static metadata for one attribute.
#[derive(Debug, Clone, Copy)]
pub struct AttributeMeta {
    pub attribute: Attribute,
    pub name: &'static str,
    pub priority: u16,
    pub label: &'static str,
    pub readable: &'static [Role],
    pub editable: &'static [Role],
    pub list_editable: bool,
    pub hide_in_list_view: bool,
}

use Role::{Admin as A, Client as C, Support as S, Technician as T};

const ATSC: &[Role] = &[A, T, S, C];
const ATS: &[Role] = &[A, T, S];
const ASC: &[Role] = &[A, S, C];
const AT: &[Role] = &[A, T];
const ONLY_A: &[Role] = &[A];
const NONE: &[Role] = &[];

const fn meta(
    attribute: Attribute,
    name: &'static str,
    priority: u16,
    label: &'static str,
    readable: &'static [Role],
    editable: &'static [Role],
) -> AttributeMeta {
    AttributeMeta {
        attribute,
        name,
        priority,
        label,
        readable,
        editable,
        list_editable: false,
        hide_in_list_view: false,
    }
}

const fn list_editable(mut m: AttributeMeta) -> AttributeMeta {
    m.list_editable = true;
    m
}

const fn hidden_in_list(mut m: AttributeMeta) -> AttributeMeta {
    m.hide_in_list_view = true;
    m
}

/// The attribute table, in priority order.
pub static ATTRIBUTES: [AttributeMeta; 31] = [
    meta(Attribute::AdwordsId, "adwords_id", 100, "Adwords ID", ATSC, ATSC),
    meta(Attribute::Nickname, "nickname", 120, "Nickname", ATSC, ATSC),
    list_editable(meta(Attribute::Status, "status", 130, "Status", ATSC, ATSC)),
    meta(Attribute::LastVisitedByEve, "last_visited_by_eve", 140, "Last Updated", ATSC, NONE),
    meta(Attribute::ClientId, "client_id", 200, "Client ID", ATS, NONE),
    meta(Attribute::Client, "client", 210, "Client", ATS, ATS),
    meta(Attribute::ClientsAllowed, "clients_allowed", 211, "Clients Allowed", ATSC, NONE),
    meta(Attribute::AutoTagOn, "auto_tag_on", 220, "Auto Tag", ATSC, AT),
    meta(Attribute::IsUnlimited, "is_unlimited", 305, "Unlimited", ASC, AT),
    meta(Attribute::CreatedAt, "created_at", 309, "Created At", ONLY_A, NONE),
    list_editable(meta(Attribute::AccountBudget, "account_budget", 310, "Account Budget", ASC, AT)),
    list_editable(meta(
        Attribute::AccountBudgetOverride,
        "account_budget_override",
        311,
        "Account Budget Override",
        ASC,
        ONLY_A,
    )),
    list_editable(meta(
        Attribute::RemainingAccountBudget,
        "remaining_account_budget",
        320,
        "Remaining Budget",
        ASC,
        ONLY_A,
    )),
    list_editable(meta(
        Attribute::RemainingAccountBudgetOverride,
        "remaining_account_budget_override",
        321,
        "Remaining Budget Override",
        ASC,
        ONLY_A,
    )),
    list_editable(meta(Attribute::DailyBudget, "daily_budget", 330, "Daily Budget", ASC, ONLY_A)),
    meta(Attribute::PercentageSpent, "percentage_spent", 340, "% Spent", ASC, NONE),
    meta(Attribute::DaysLeft, "days_left", 350, "Days Left", ASC, NONE),
    meta(Attribute::Currency, "currency", 360, "Currency", ASC, AT),
    list_editable(meta(Attribute::ExchangeRate, "exchange_rate", 370, "Exchange Rate", ASC, AT)),
    meta(Attribute::Spent, "spent", 380, "Spent", ASC, NONE),
    meta(Attribute::SpentInHkd, "spent_in_hkd", 390, "Spent (HKD)", ASC, NONE),
    meta(Attribute::RemainingInHkd, "remaining_in_hkd", 399, "Remaining (HKD)", ASC, NONE),
    hidden_in_list(meta(Attribute::VendorId, "vendor_id", 400, "Vendor ID", ONLY_A, AT)),
    meta(Attribute::Vendor, "vendor", 401, "Vendor", ONLY_A, AT),
    meta(Attribute::DaysToTopup, "days_to_topup", 402, "Days to Top-up", ONLY_A, NONE),
    meta(Attribute::Batch, "batch", 410, "Batch", AT, AT),
    meta(Attribute::Vpss, "VPSs", 500, "VPS", AT, AT),
    meta(Attribute::Login, "login", 520, "Login", AT, AT),
    meta(Attribute::Password, "password", 522, "Password", AT, AT),
    meta(Attribute::ExternalComment, "external_comment", 998, "External Comment", NONE, NONE),
    meta(Attribute::InternalComment, "internal_comment", 999, "Internal Comment", ATS, ATS),
];

/// How a column set is being requested.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Detail screen, read-only.
    Read,
    /// Create/edit form.
    Edit,
    /// List screen columns.
    ListRead,
    /// Columns editable inline from the list screen.
    ListEdit,
}

impl AccessMode {
    pub const ALL: [AccessMode; 4] = [AccessMode::Read, AccessMode::Edit, AccessMode::ListRead, AccessMode::ListEdit];
}

/// Value kind of a stored column, used to parse form input and events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Status,
    Number,
    Flag,
    Id,
    Ids,
    Time,
}

impl Attribute {
    pub fn meta(self) -> &'static AttributeMeta {
        // The table is declared in enum order.
        &ATTRIBUTES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.meta().name
    }

    pub fn label(self) -> &'static str {
        self.meta().label
    }

    pub fn priority(self) -> u16 {
        self.meta().priority
    }

    /// Look an attribute up by column name. Unknown names resolve to `None`.
    pub fn from_name(name: &str) -> Option<Attribute> {
        ATTRIBUTES.iter().find(|m| m.name == name).map(|m| m.attribute)
    }

    pub fn is_readable_by(self, role: Role) -> bool {
        self.meta().readable.contains(&role)
    }

    pub fn is_editable_by(self, role: Role) -> bool {
        self.meta().editable.contains(&role)
    }

    /// The stored column a form field writes to. Derived attributes have none;
    /// relations write their foreign-key column.
    pub fn column(self) -> Option<Attribute> {
        match self {
            Attribute::Client => Some(Attribute::ClientId),
            Attribute::Vendor => Some(Attribute::VendorId),
            a if a.kind().is_some() => Some(a),
            _ => None,
        }
    }

    /// Value kind of stored columns (`None` for derived attributes).
    pub fn kind(self) -> Option<ValueKind> {
        use Attribute::*;
        match self {
            AdwordsId | Nickname | Currency | Batch | Login | Password | ExternalComment
            | InternalComment => Some(ValueKind::Text),
            Status => Some(ValueKind::Status),
            AccountBudget | AccountBudgetOverride | RemainingAccountBudget
            | RemainingAccountBudgetOverride | DailyBudget | ExchangeRate => Some(ValueKind::Number),
            AutoTagOn | IsUnlimited => Some(ValueKind::Flag),
            ClientId | VendorId => Some(ValueKind::Id),
            Vpss => Some(ValueKind::Ids),
            LastVisitedByEve => Some(ValueKind::Time),
            Client | ClientsAllowed | CreatedAt | PercentageSpent | DaysLeft | Spent | SpentInHkd
            | RemainingInHkd | Vendor | DaysToTopup => None,
        }
    }
}

impl core::fmt::Display for Attribute {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

static RESOLVED: LazyLock<HashMap<(AccessMode, Role), Vec<Attribute>>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    for mode in AccessMode::ALL {
        for role in Role::ALL {
            table.insert((mode, role), compute(mode, role));
        }
    }
    table
});

fn compute(mode: AccessMode, role: Role) -> Vec<Attribute> {
    let mut metas: Vec<&AttributeMeta> = ATTRIBUTES
        .iter()
        .filter(|m| match mode {
            AccessMode::Read => m.readable.contains(&role),
            // The raw foreign key is edited through the `vendor` relation.
            AccessMode::Edit => m.editable.contains(&role) && m.attribute != Attribute::VendorId,
            AccessMode::ListRead => m.readable.contains(&role) && !m.hide_in_list_view,
            AccessMode::ListEdit => {
                m.readable.contains(&role)
                    && !m.hide_in_list_view
                    && m.list_editable
                    && m.editable.contains(&role)
            }
        })
        .collect();
    metas.sort_by_key(|m| m.priority);
    metas.into_iter().map(|m| m.attribute).collect()
}

/// Ordered attributes visible for `mode` to `role`.
pub fn columns(mode: AccessMode, role: Role) -> &'static [Attribute] {
    RESOLVED.get(&(mode, role)).map(Vec::as_slice).unwrap_or(&[])
}

/// Column names for `mode`/`role`, in display order.
pub fn column_names(mode: AccessMode, role: Role) -> Vec<&'static str> {
    columns(mode, role).iter().map(|a| a.name()).collect()
}

/// Column labels for `mode`/`role`, in display order.
pub fn column_labels(mode: AccessMode, role: Role) -> Vec<&'static str> {
    columns(mode, role).iter().map(|a| a.label()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn table_is_in_enum_order_with_distinct_priorities() {
        for (idx, m) in ATTRIBUTES.iter().enumerate() {
            assert_eq!(m.attribute as usize, idx, "{} out of order", m.name);
            assert_eq!(Attribute::from_name(m.name), Some(m.attribute));
        }
        let mut priorities: Vec<_> = ATTRIBUTES.iter().map(|m| m.priority).collect();
        priorities.dedup();
        assert_eq!(priorities.len(), ATTRIBUTES.len());
        assert!(priorities.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unknown_names_are_absent() {
        assert_eq!(Attribute::from_name("country"), None);
        assert_eq!(Attribute::from_name("id"), None);
    }

    #[test]
    fn client_reads_budget_but_not_operational_columns() {
        let read = columns(AccessMode::Read, Role::Client);
        assert!(read.contains(&Attribute::AccountBudget));
        assert!(read.contains(&Attribute::ClientsAllowed));
        assert!(!read.contains(&Attribute::Login));
        assert!(!read.contains(&Attribute::Password));
        assert!(!read.contains(&Attribute::ClientId));
        assert!(!read.contains(&Attribute::InternalComment));
    }

    #[test]
    fn technician_cannot_read_money_columns() {
        let read = columns(AccessMode::Read, Role::Technician);
        assert!(!read.contains(&Attribute::AccountBudget));
        assert!(!read.contains(&Attribute::SpentInHkd));
        assert!(read.contains(&Attribute::Vpss));
        assert!(read.contains(&Attribute::Password));
    }

    #[test]
    fn external_comment_is_invisible_to_everyone() {
        for role in Role::ALL {
            for mode in AccessMode::ALL {
                assert!(!columns(mode, role).contains(&Attribute::ExternalComment));
            }
        }
    }

    #[test]
    fn edit_excludes_raw_vendor_id() {
        let admin_edit = columns(AccessMode::Edit, Role::Admin);
        assert!(!admin_edit.contains(&Attribute::VendorId));
        assert!(admin_edit.contains(&Attribute::Vendor));
        assert_eq!(
            column_names(AccessMode::Edit, Role::Client),
            vec!["adwords_id", "nickname", "status"]
        );
    }

    #[test]
    fn list_view_hides_vendor_id_for_admin() {
        assert!(columns(AccessMode::Read, Role::Admin).contains(&Attribute::VendorId));
        assert!(!columns(AccessMode::ListRead, Role::Admin).contains(&Attribute::VendorId));
    }

    #[test]
    fn list_edit_is_intersection() {
        assert_eq!(
            column_names(AccessMode::ListEdit, Role::Admin),
            vec![
                "status",
                "account_budget",
                "account_budget_override",
                "remaining_account_budget",
                "remaining_account_budget_override",
                "daily_budget",
                "exchange_rate",
            ]
        );
        assert_eq!(column_names(AccessMode::ListEdit, Role::Support), vec!["status"]);
        assert_eq!(column_names(AccessMode::ListEdit, Role::Technician), vec!["status"]);
        assert_eq!(column_names(AccessMode::ListEdit, Role::Client), vec!["status"]);
    }

    #[test]
    fn relations_write_foreign_keys() {
        assert_eq!(Attribute::Client.column(), Some(Attribute::ClientId));
        assert_eq!(Attribute::Vendor.column(), Some(Attribute::VendorId));
        assert_eq!(Attribute::Vpss.column(), Some(Attribute::Vpss));
        assert_eq!(Attribute::Spent.column(), None);
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_mode() -> impl Strategy<Value = AccessMode> {
        prop::sample::select(AccessMode::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn columns_are_sorted_by_priority(mode in any_mode(), role in any_role()) {
            let cols = columns(mode, role);
            prop_assert!(cols.windows(2).all(|w| w[0].priority() < w[1].priority()));
        }

        #[test]
        fn list_read_is_read_minus_hidden(role in any_role()) {
            let expected: Vec<_> = columns(AccessMode::Read, role)
                .iter()
                .copied()
                .filter(|a| !a.meta().hide_in_list_view)
                .collect();
            prop_assert_eq!(columns(AccessMode::ListRead, role), expected.as_slice());
        }

        #[test]
        fn list_edit_is_subset_of_edit_and_list_read(role in any_role()) {
            for a in columns(AccessMode::ListEdit, role) {
                prop_assert!(columns(AccessMode::ListRead, role).contains(a));
                prop_assert!(a.is_editable_by(role));
                prop_assert!(a.meta().list_editable);
            }
        }
    }
}
