//! Budget and spend derivations.

use serde::{Deserialize, Serialize};

/// Sort sentinel for accounts whose runway cannot be computed.
pub const DAYS_LEFT_UNKNOWN: i64 = 99;

/// The raw budget columns of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetFigures {
    pub account_budget: Option<f64>,
    pub account_budget_override: Option<f64>,
    pub remaining_account_budget: Option<f64>,
    pub remaining_account_budget_override: Option<f64>,
    pub daily_budget: Option<f64>,
    pub exchange_rate: Option<f64>,
}

impl BudgetFigures {
    /// Override wins over the scraped value.
    pub fn effective_account_budget(&self) -> Option<f64> {
        self.account_budget_override.or(self.account_budget)
    }

    pub fn effective_remaining_budget(&self) -> Option<f64> {
        self.remaining_account_budget_override.or(self.remaining_account_budget)
    }

    pub fn spent(&self) -> Option<f64> {
        Some(self.effective_account_budget()? - self.effective_remaining_budget()?)
    }

    /// Spend converted with the account's exchange rate; zero when unknown.
    pub fn spent_in_hkd(&self) -> f64 {
        match (self.spent(), self.exchange_rate) {
            (Some(spent), Some(rate)) => spent * rate,
            _ => 0.0,
        }
    }

    pub fn remaining_in_hkd(&self) -> Option<f64> {
        Some(self.effective_remaining_budget()? * self.exchange_rate?)
    }

    pub fn daily_budget_in_hkd(&self) -> Option<f64> {
        Some(self.daily_budget? * self.exchange_rate?)
    }

    pub fn percentage_spent(&self) -> Option<f64> {
        let budget = self.effective_account_budget()?;
        if budget == 0.0 {
            return None;
        }
        Some(100.0 * self.spent()? / budget)
    }

    /// Whole days the remaining budget lasts at the daily rate.
    ///
    /// Returns [`DAYS_LEFT_UNKNOWN`] when either figure is missing or the daily
    /// budget is zero.
    pub fn days_left(&self) -> i64 {
        match (self.effective_remaining_budget(), self.daily_budget) {
            (Some(remaining), Some(daily)) if daily != 0.0 => (remaining / daily).floor() as i64,
            _ => DAYS_LEFT_UNKNOWN,
        }
    }
}

/// Round half away from zero to 2 decimals (monitoring export).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
