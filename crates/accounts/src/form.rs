//! Account forms: which fields a role may submit and what makes them valid.
//!
//! Forms are keyed by attribute name (`client`, `vendor`, `VPSs`, ...). Parsed
//! values are keyed by the stored column they write to, ready for
//! [`crate::account::CreateAccount`] / [`crate::account::UpdateAccount`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use adportal_auth::Role;
use adportal_core::{AccountId, FieldErrors, UserId, VendorId, VpsId};
use adportal_hosts::{HostedAccount, Vps};

use crate::account::Account;
use crate::attributes::{columns, AccessMode, Attribute};
use crate::status::AccountStatus;
use crate::validation::{check_adwords_id, check_form_status};
use crate::value::FieldValue;
use crate::view::hosted_on;

/// Column → value, keyed by stored column.
pub type FormValues = BTreeMap<Attribute, FieldValue>;

/// Fields required on create when the role may edit them.
const REQUIRED: [Attribute; 6] = [
    Attribute::AdwordsId,
    Attribute::Status,
    Attribute::Vendor,
    Attribute::Login,
    Attribute::Password,
    Attribute::Vpss,
];

/// Left out of the batch uploader.
const BATCH_EXCLUDED: [Attribute; 6] = [
    Attribute::Nickname,
    Attribute::AutoTagOn,
    Attribute::DailyBudget,
    Attribute::ExternalComment,
    Attribute::AccountBudgetOverride,
    Attribute::RemainingAccountBudgetOverride,
];

pub const CURRENCY_CHOICES: [&str; 11] =
    ["USD", "HKD", "RMB", "SGD", "VND", "NTD", "JPY", "MYR", "AUD", "EUR", "ARS"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    /// Fields the role may not submit in this mode.
    #[error("fields not editable: {}", .0.join(", "))]
    Forbidden(Vec<String>),

    #[error("validation failed: {0}")]
    Fields(FieldErrors),
}

/// What form validation needs to know about the rest of the system.
pub trait FormLookups {
    /// Another live account already uses `adwords_id`.
    fn adwords_id_taken(&self, adwords_id: &str, except: Option<AccountId>) -> bool;

    fn permission_exists(&self, vendor: VendorId, client: UserId) -> bool;

    fn client_exists(&self, id: UserId) -> bool;

    fn vendor_exists(&self, id: VendorId) -> bool;

    fn vps(&self, id: VpsId) -> Option<Vps>;

    /// Live accounts currently on `vps`.
    fn accounts_on(&self, vps: VpsId) -> Vec<Account>;
}

/// Parse a submitted form for `role` in `mode` (`Edit` or `ListEdit`).
pub fn parse_submission(role: Role, mode: AccessMode, input: &Map<String, JsonValue>) -> Result<FormValues, FormError> {
    let allowed = columns(mode, role);
    let forbidden: Vec<String> = input
        .keys()
        .filter(|name| Attribute::from_name(name).is_none_or(|a| !allowed.contains(&a)))
        .cloned()
        .collect();
    if !forbidden.is_empty() {
        return Err(FormError::Forbidden(forbidden));
    }

    let mut values = FormValues::new();
    let mut errors = FieldErrors::new();
    for (name, raw) in input {
        let Some(column) = Attribute::from_name(name).and_then(Attribute::column) else {
            continue;
        };
        let Some(kind) = column.kind() else {
            continue;
        };
        match FieldValue::parse_input(kind, raw) {
            Ok(value) => {
                values.insert(column, value);
            }
            Err(msg) => errors.add(name.as_str(), msg),
        }
    }
    finish(errors)?;
    Ok(values)
}

fn finish(errors: FieldErrors) -> Result<(), FormError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FormError::Fields(errors))
    }
}

fn required_for(role: Role) -> impl Iterator<Item = Attribute> {
    let editable = columns(AccessMode::Edit, role);
    REQUIRED.into_iter().filter(move |a| editable.contains(a))
}

/// Checks shared by create and edit on the submitted values.
fn check_values(values: &FormValues, errors: &mut FieldErrors, lookups: &impl FormLookups, except: Option<AccountId>) {
    if let Some(value) = values.get(&Attribute::AdwordsId) {
        if let Some(id) = value.as_text() {
            match check_adwords_id(id) {
                Err(msg) => errors.add(Attribute::AdwordsId.name(), msg),
                Ok(()) if lookups.adwords_id_taken(id, except) => {
                    errors.add(Attribute::AdwordsId.name(), "Already exists.");
                }
                Ok(()) => {}
            }
        }
    }
    if let Some(status) = values
        .get(&Attribute::Status)
        .and_then(FieldValue::as_text)
        .and_then(|s| s.parse::<AccountStatus>().ok())
    {
        if let Err(msg) = check_form_status(status) {
            errors.add(Attribute::Status.name(), msg);
        }
    }
    if let Some(client) = values.get(&Attribute::ClientId).and_then(FieldValue::as_id) {
        if !lookups.client_exists(UserId::new(client)) {
            errors.add(Attribute::Client.name(), "Not a valid choice.");
        }
    }
    if let Some(vendor) = values.get(&Attribute::VendorId).and_then(FieldValue::as_id) {
        if !lookups.vendor_exists(VendorId::new(vendor)) {
            errors.add(Attribute::Vendor.name(), "Not a valid choice.");
        }
    }
}

fn check_hosts(
    vps_ids: &[i64],
    login: Option<&str>,
    errors: &mut FieldErrors,
    lookups: &impl FormLookups,
    pending: &BTreeMap<VpsId, Vec<Option<String>>>,
) {
    for id in vps_ids.iter().copied().map(VpsId::new) {
        let Some(vps) = lookups.vps(id) else {
            errors.add(Attribute::Vpss.name(), "Not a valid choice.");
            continue;
        };
        let current = lookups.accounts_on(id);
        let mut hosted = hosted_on(&current, id);
        if let Some(extra) = pending.get(&id) {
            hosted.extend(extra.iter().map(|login| HostedAccount {
                status: AccountStatus::default().as_str(),
                is_dead: false,
                login: login.as_deref(),
            }));
        }
        if let Err(msg) = vps.check_capacity(&hosted, login) {
            errors.add(Attribute::Vpss.name(), msg);
        }
    }
}

fn permission_message(client: Option<UserId>, vendor: Option<VendorId>) -> String {
    let show = |id: Option<i64>| id.map(|v| v.to_string()).unwrap_or_else(|| "None".to_string());
    format!(
        "User(id={}) is not allowed to use accounts from Vendor(id={}).",
        show(client.map(UserId::get)),
        show(vendor.map(VendorId::get))
    )
}

fn validate_new(
    role: Role,
    values: &FormValues,
    lookups: &impl FormLookups,
    pending: &BTreeMap<VpsId, Vec<Option<String>>>,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for attribute in required_for(role) {
        let column = attribute.column().unwrap_or(attribute);
        if values.get(&column).is_none_or(FieldValue::is_blank) {
            errors.add(attribute.name(), "This field is required.");
        }
    }
    check_values(values, &mut errors, lookups, None);

    let login = values.get(&Attribute::Login).and_then(FieldValue::as_text);
    if let Some(ids) = values.get(&Attribute::Vpss).and_then(FieldValue::as_ids) {
        check_hosts(ids, login, &mut errors, lookups, pending);
    }

    let client = values.get(&Attribute::ClientId).and_then(FieldValue::as_id).map(UserId::new);
    let vendor = values.get(&Attribute::VendorId).and_then(FieldValue::as_id).map(VendorId::new);
    if let (Some(c), Some(v)) = (client, vendor) {
        if !lookups.permission_exists(v, c) {
            errors.add(Attribute::Client.name(), permission_message(client, vendor));
        }
    }
    errors
}

/// Validate a create form. `values` come from [`parse_submission`].
pub fn validate_create(role: Role, values: &FormValues, lookups: &impl FormLookups) -> Result<(), FormError> {
    finish(validate_new(role, values, lookups, &BTreeMap::new()))
}

/// Validate an edit of `account`. Only submitted fields are checked.
pub fn validate_edit(role: Role, account: &Account, values: &FormValues, lookups: &impl FormLookups) -> Result<(), FormError> {
    let mut errors = FieldErrors::new();
    for attribute in required_for(role) {
        let column = attribute.column().unwrap_or(attribute);
        if values.get(&column).is_some_and(FieldValue::is_blank) {
            errors.add(attribute.name(), "This field is required.");
        }
    }

    // Keep a status the account already has, even one forms can't pick.
    let mut checked = values.clone();
    if checked.get(&Attribute::Status) == Some(&account.get(Attribute::Status)) {
        checked.remove(&Attribute::Status);
    }
    check_values(&checked, &mut errors, lookups, Some(account.id_typed()));

    if let Some(ids) = values.get(&Attribute::Vpss).and_then(FieldValue::as_ids) {
        let login = match values.get(&Attribute::Login) {
            Some(value) => value.as_text().map(str::to_string),
            None => account.fields().login.clone(),
        };
        let current: BTreeSet<i64> = account.fields().vps_ids.iter().map(|id| id.get()).collect();
        let added: Vec<i64> = ids.iter().copied().filter(|id| !current.contains(id)).collect();
        check_hosts(&added, login.as_deref(), &mut errors, lookups, &BTreeMap::new());
    }

    let fields = account.fields();
    let submitted_client = values.get(&Attribute::ClientId).and_then(FieldValue::as_id).map(UserId::new);
    let submitted_vendor = values.get(&Attribute::VendorId).and_then(FieldValue::as_id).map(VendorId::new);
    let modified = submitted_client.is_some_and(|c| Some(c) != fields.client_id)
        || submitted_vendor.is_some_and(|v| Some(v) != fields.vendor_id);
    if modified {
        let client = submitted_client.or(fields.client_id);
        let vendor = submitted_vendor.or(fields.vendor_id);
        let granted = match (vendor, client) {
            (Some(v), Some(c)) => lookups.permission_exists(v, c),
            _ => false,
        };
        if !granted {
            errors.add(Attribute::Client.name(), permission_message(client, vendor));
        }
    }

    finish(errors)
}

/// Uploader columns for `role`, in display order.
pub fn batch_columns(role: Role) -> Vec<Attribute> {
    columns(AccessMode::Edit, role)
        .iter()
        .copied()
        .filter(|a| !BATCH_EXCLUDED.contains(a))
        .collect()
}

/// Setup data for the batch uploader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSetup {
    pub columns: Vec<&'static str>,
    /// Required columns carry a trailing `" *"`.
    pub labels: Vec<String>,
    pub status_choices: Vec<&'static str>,
    pub currency_choices: Vec<&'static str>,
}

pub fn batch_setup(role: Role) -> BatchSetup {
    let required: Vec<Attribute> = required_for(role).collect();
    let columns = batch_columns(role);
    BatchSetup {
        columns: columns.iter().map(|a| a.name()).collect(),
        labels: columns
            .iter()
            .map(|a| {
                if required.contains(a) {
                    format!("{} *", a.label())
                } else {
                    a.label().to_string()
                }
            })
            .collect(),
        status_choices: AccountStatus::new_account_choices().map(AccountStatus::label).collect(),
        currency_choices: CURRENCY_CHOICES.to_vec(),
    }
}

/// 1-based row number → field errors.
pub type BatchErrors = BTreeMap<usize, FieldErrors>;

fn is_empty_row(row: &[JsonValue]) -> bool {
    row.iter().all(|cell| match cell {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Bool(b) => !b,
        _ => false,
    })
}

/// Parse and validate every uploaded row. Nothing is returned unless all
/// rows pass, checked against the store and against each other.
pub fn validate_batch(role: Role, rows: &[Vec<JsonValue>], lookups: &impl FormLookups) -> Result<Vec<FormValues>, BatchErrors> {
    let columns = batch_columns(role);
    let mut accepted = Vec::new();
    let mut errors = BatchErrors::new();
    let mut seen_ids: BTreeSet<String> = BTreeSet::new();
    let mut pending: BTreeMap<VpsId, Vec<Option<String>>> = BTreeMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 1;
        if is_empty_row(row) {
            continue;
        }
        let mut row_errors = FieldErrors::new();
        if row.len() != columns.len() {
            row_errors.add("row", format!("Expected {} cells, got {}.", columns.len(), row.len()));
            errors.insert(row_number, row_errors);
            continue;
        }

        let mut values = FormValues::new();
        for (attribute, cell) in columns.iter().zip(row) {
            let Some(column) = attribute.column() else {
                continue;
            };
            let Some(kind) = column.kind() else {
                continue;
            };
            match FieldValue::parse_input(kind, cell) {
                Ok(value) => {
                    values.insert(column, value);
                }
                Err(msg) => row_errors.add(attribute.name(), msg),
            }
        }

        row_errors.merge(validate_new(role, &values, lookups, &pending));
        if let Some(id) = values.get(&Attribute::AdwordsId).and_then(FieldValue::as_text) {
            if !seen_ids.insert(id.to_string()) {
                row_errors.add(Attribute::AdwordsId.name(), "Duplicated in this upload.");
            }
        }

        if row_errors.is_empty() {
            let login = values.get(&Attribute::Login).and_then(FieldValue::as_text).map(str::to_string);
            for id in values.get(&Attribute::Vpss).and_then(FieldValue::as_ids).unwrap_or_default() {
                pending.entry(VpsId::new(*id)).or_default().push(login.clone());
            }
            accepted.push(values);
        } else {
            errors.insert(row_number, row_errors);
        }
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}
