//! Ad accounts domain module (event-sourced).
//!
//! This crate contains the account aggregate, the role/attribute visibility
//! resolver, budget derivations, form validation, history rendering and the
//! dashboard widgets. Pure domain logic: no IO, no HTTP, no storage.

pub mod access;
pub mod account;
pub mod attributes;
pub mod budget;
pub mod form;
pub mod history;
pub mod numeral;
pub mod status;
pub mod validation;
pub mod value;
pub mod view;
pub mod widgets;

pub use access::Access;
pub use account::{
    Account, AccountCommand, AccountCreated, AccountDeleted, AccountEvent, AccountFields, AccountUpdated,
    CreateAccount, DeleteAccount, FieldChange, RecordIngestion, UpdateAccount,
};
pub use attributes::{column_labels, column_names, columns, AccessMode, Attribute, AttributeMeta, ValueKind, ATTRIBUTES};
pub use budget::{round2, BudgetFigures, DAYS_LEFT_UNKNOWN};
pub use form::{
    batch_columns, batch_setup, parse_submission, validate_batch, validate_create, validate_edit, BatchErrors,
    BatchSetup, FormError, FormLookups, FormValues, CURRENCY_CHOICES,
};
pub use history::{
    format_hk, hk_time, recent_status_changes, render_event, render_history, suspended_on, HistoryEntry,
    HistoryKind, StatusChange, INGESTION_ACTOR,
};
pub use numeral::{parse_currency, parse_money, parse_numeral, NumeralError};
pub use status::{AccountStatus, UnknownStatus};
pub use validation::{check_adwords_id, check_form_status, is_valid_adwords_id, ADWORDS_ID_MESSAGE};
pub use value::FieldValue;
pub use view::{
    display_value, hosted_on, monitoring_entry, render_detail, render_row, render_table, AccountFilter,
    AccountLookups, AccountRow, AccountTable, MonitoringEntry,
};
pub use widgets::{
    active_accounts, attention, expiring, high_spend, not_updated, releasable_hosts, shift_start, total_spend,
    vendor_logins, vendor_statistics, vendor_usage, ActiveAccountRow, ActiveSnapshot, DailySpend, NotUpdated,
    VendorStatistics, VendorUsage, NOT_UPDATED_SHIFTS, TOTAL_SPEND_DAYS,
};
