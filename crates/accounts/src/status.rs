use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of an advertising account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Uninitialized,
    Unassigned,
    Reserved,
    Attention,
    AppealRequested,
    AppealSubmitted,
    Active,
    Disapproved,
    Suspended,
    Abandoned,
}

/// Display order used by dropdowns and grouped widgets.
const ORDERED: [(AccountStatus, &str, &str); 10] = [
    (AccountStatus::Attention, "0_Attention_注意", "Account requires attention. Do Not Use."),
    (AccountStatus::AppealRequested, "1_Appeal-Requested_申述请求", "Client requested this account to be appealed."),
    (AccountStatus::AppealSubmitted, "2_Appeal-Submitted_申述已提交", "Appeal has been submitted."),
    (AccountStatus::Uninitialized, "3_Uninitialized_没准备", "Account is not ready"),
    (AccountStatus::Unassigned, "4_Unassigned_新号", "Account is free for use for anyone"),
    (
        AccountStatus::Reserved,
        "5_Reserved_已分配",
        "Account is already assigned to someone. However, this account has NOT been accessed yet. In the event of an emergency, you may reassign this to somebody else.",
    ),
    (AccountStatus::Active, "6_Active_现行", "Account has ad approved and is spending."),
    (AccountStatus::Disapproved, "7_Disapproved_不通过", "Account has ad disapproved."),
    (AccountStatus::Abandoned, "8_Abandoned_废弃", "We no longer want to deal with this account anymore."),
    (AccountStatus::Suspended, "9_Suspended_挂号", "Account is suspended."),
];

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Uninitialized => "uninitialized",
            AccountStatus::Unassigned => "unassigned",
            AccountStatus::Reserved => "reserved",
            AccountStatus::Attention => "attention",
            AccountStatus::AppealRequested => "appeal_requested",
            AccountStatus::AppealSubmitted => "appeal_submitted",
            AccountStatus::Active => "active",
            AccountStatus::Disapproved => "disapproved",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Abandoned => "abandoned",
        }
    }

    /// Upper-case name, as exported to monitoring.
    pub fn name(self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    pub fn label(self) -> &'static str {
        Self::entry(self).1
    }

    pub fn description(self) -> &'static str {
        Self::entry(self).2
    }

    fn entry(self) -> &'static (AccountStatus, &'static str, &'static str) {
        ORDERED
            .iter()
            .find(|(s, _, _)| *s == self)
            .unwrap_or(&ORDERED[0])
    }

    /// All statuses in display order.
    pub fn all() -> impl Iterator<Item = AccountStatus> {
        ORDERED.iter().map(|(s, _, _)| *s)
    }

    /// Statuses a freshly created account may start in.
    pub fn new_account_choices() -> impl Iterator<Item = AccountStatus> {
        Self::all().filter(|s| {
            matches!(
                s,
                AccountStatus::Uninitialized
                    | AccountStatus::Unassigned
                    | AccountStatus::Reserved
                    | AccountStatus::Active
            )
        })
    }

    /// The account has been handed out and used at least once.
    pub fn is_activated(self) -> bool {
        !matches!(
            self,
            AccountStatus::Uninitialized | AccountStatus::Unassigned | AccountStatus::Reserved
        )
    }

    /// Suspended and abandoned accounts no longer count against a host.
    pub fn is_dead(self) -> bool {
        matches!(self, AccountStatus::Suspended | AccountStatus::Abandoned)
    }

    /// Statuses the system sets on its own; forms may not choose them.
    pub fn is_deprecated_on_forms(self) -> bool {
        matches!(
            self,
            AccountStatus::AppealRequested | AccountStatus::AppealSubmitted | AccountStatus::Disapproved
        )
    }

    pub fn needs_attention(self) -> bool {
        matches!(
            self,
            AccountStatus::Attention
                | AccountStatus::AppealRequested
                | AccountStatus::AppealSubmitted
                | AccountStatus::Uninitialized
        )
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Uninitialized
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown account status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AccountStatus {
    type Err = UnknownStatus;

    /// Accepts the snake_case value, the upper-case name, or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ORDERED
            .iter()
            .find(|(status, label, _)| {
                *label == needle || status.as_str().eq_ignore_ascii_case(needle)
            })
            .map(|(status, _, _)| *status)
            .ok_or_else(|| UnknownStatus(needle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_names_and_labels() {
        assert_eq!("active".parse::<AccountStatus>().unwrap(), AccountStatus::Active);
        assert_eq!("APPEAL_SUBMITTED".parse::<AccountStatus>().unwrap(), AccountStatus::AppealSubmitted);
        assert_eq!("9_Suspended_挂号".parse::<AccountStatus>().unwrap(), AccountStatus::Suspended);
        assert!("frozen".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn every_status_has_a_label() {
        assert_eq!(AccountStatus::all().count(), 10);
        for status in AccountStatus::all() {
            assert_eq!(status.label().parse::<AccountStatus>().unwrap(), status);
        }
    }

    #[test]
    fn new_account_choices_keep_display_order() {
        let choices: Vec<_> = AccountStatus::new_account_choices().collect();
        assert_eq!(
            choices,
            vec![
                AccountStatus::Uninitialized,
                AccountStatus::Unassigned,
                AccountStatus::Reserved,
                AccountStatus::Active
            ]
        );
    }

    #[test]
    fn activation_and_liveness() {
        assert!(!AccountStatus::Reserved.is_activated());
        assert!(AccountStatus::Attention.is_activated());
        assert!(AccountStatus::Abandoned.is_dead());
        assert!(!AccountStatus::Disapproved.is_dead());
        assert_eq!(AccountStatus::AppealRequested.name(), "APPEAL_REQUESTED");
    }
}
