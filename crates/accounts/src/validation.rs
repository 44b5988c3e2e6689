//! Field rules shared by the aggregate and the forms.

use std::sync::LazyLock;

use regex::Regex;

use crate::status::AccountStatus;

static ADWORDS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}-[0-9]{3}-[0-9]{4}$").expect("static regex is valid"));

pub const ADWORDS_ID_MESSAGE: &str = "Adwords ID must be in the format of 123-456-7890.";
pub const DEPRECATED_STATUS_MESSAGE: &str =
    "Deprecated. Please use only Uninitialized, Unassigned, Reserved, Active, Suspended & Abandoned.";

pub fn is_valid_adwords_id(value: &str) -> bool {
    ADWORDS_ID.is_match(value)
}

pub fn check_adwords_id(value: &str) -> Result<(), &'static str> {
    if is_valid_adwords_id(value) {
        Ok(())
    } else {
        Err(ADWORDS_ID_MESSAGE)
    }
}

/// Forms may not pick statuses that only the review workflow sets.
pub fn check_form_status(status: AccountStatus) -> Result<(), &'static str> {
    if status.is_deprecated_on_forms() {
        Err(DEPRECATED_STATUS_MESSAGE)
    } else {
        Ok(())
    }
}
