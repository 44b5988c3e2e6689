use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use adportal_core::{BankAccountId, DomainResult, Entity, FieldErrors, TransferId};

/// Money moved to a bank account (payment to vendors) or from it (refund).
/// `counter_party` is the origin of a payment or the destination of a refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub bank_account_id: Option<BankAccountId>,
    pub counter_party: Option<String>,
    pub gross: f64,
    pub net: Option<f64>,
    pub currency: Option<String>,
    pub exchange_rate: f64,
    pub is_refund: bool,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDraft {
    #[serde(default)]
    pub bank_account_id: Option<BankAccountId>,
    #[serde(default)]
    pub counter_party: Option<String>,
    pub gross: f64,
    #[serde(default)]
    pub net: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub exchange_rate: f64,
    #[serde(default)]
    pub is_refund: bool,
    #[serde(default)]
    pub notes: Option<String>,
    pub date: NaiveDate,
}

impl TransferDraft {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if !self.gross.is_finite() {
            errors.add("gross", "Not a valid float value.");
        }
        if self.net.is_some_and(|n| !n.is_finite()) {
            errors.add("net", "Not a valid float value.");
        }
        if !self.exchange_rate.is_finite() || self.exchange_rate <= 0.0 {
            errors.add("exchange_rate", "Exchange rate must be positive.");
        }
        if let Some(counter_party) = &self.counter_party {
            if counter_party.chars().count() > 96 {
                errors.add("counter_party", "Field cannot be longer than 96 characters.");
            }
        }
        errors.into_result()
    }
}

impl Transfer {
    pub fn create(id: TransferId, draft: TransferDraft, now: DateTime<Utc>) -> Self {
        let mut transfer = Self {
            id,
            bank_account_id: None,
            counter_party: None,
            gross: 0.0,
            net: None,
            currency: None,
            exchange_rate: 1.0,
            is_refund: false,
            notes: None,
            date: draft.date,
            created_at: now,
            updated_at: now,
        };
        transfer.update(draft, now);
        transfer
    }

    pub fn update(&mut self, draft: TransferDraft, now: DateTime<Utc>) {
        self.bank_account_id = draft.bank_account_id;
        self.counter_party = draft.counter_party;
        self.gross = draft.gross;
        self.net = draft.net;
        self.currency = draft.currency;
        self.exchange_rate = draft.exchange_rate;
        self.is_refund = draft.is_refund;
        self.notes = draft.notes;
        self.date = draft.date;
        self.updated_at = now;
    }

    /// Net amount in HKD. Zero or missing nets count as nothing sent.
    pub fn net_in_hkd(&self) -> Option<f64> {
        match self.net {
            Some(net) if net != 0.0 && self.exchange_rate != 0.0 => Some(net * self.exchange_rate),
            _ => None,
        }
    }

    /// Expected net for each distinct service fee among `fees` (the fees of
    /// the vendors sharing this transfer's bank account).
    pub fn suggested_net(&self, fees: impl IntoIterator<Item = Option<f64>>) -> SuggestedNet {
        let mut fees: Vec<f64> = fees.into_iter().flatten().collect();
        fees.sort_by(f64::total_cmp);
        fees.dedup();
        if fees.is_empty() {
            return SuggestedNet::NotSet;
        }
        SuggestedNet::Amounts(
            fees.into_iter()
                .map(|fee| SuggestedAmount {
                    service_fee: fee,
                    net: self.gross * (100.0 - fee) / 100.0,
                })
                .collect(),
        )
    }
}

impl Entity for Transfer {
    type Id = TransferId;

    fn id(&self) -> TransferId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuggestedAmount {
    pub service_fee: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedNet {
    NotSet,
    Amounts(Vec<SuggestedAmount>),
}

impl core::fmt::Display for SuggestedNet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SuggestedNet::NotSet => f.write_str("Not Set"),
            SuggestedNet::Amounts(amounts) => {
                for (idx, a) in amounts.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:.2} ({}%)", a.net, a.service_fee)?;
                }
                Ok(())
            }
        }
    }
}
