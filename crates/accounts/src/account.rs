use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adportal_core::{AccountId, Aggregate, AggregateRoot, DomainError, FieldErrors, UserId, VendorId, VpsId};
use adportal_events::Event;

use crate::attributes::{Attribute, ValueKind};
use crate::budget::BudgetFigures;
use crate::status::AccountStatus;
use crate::validation::check_adwords_id;
use crate::value::FieldValue;

/// Stored columns of an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountFields {
    pub adwords_id: String,
    pub nickname: Option<String>,
    pub status: AccountStatus,
    pub budget: BudgetFigures,
    pub currency: Option<String>,
    pub is_unlimited: bool,
    pub auto_tag_on: bool,
    pub batch: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub external_comment: Option<String>,
    pub internal_comment: Option<String>,
    pub client_id: Option<UserId>,
    pub vendor_id: Option<VendorId>,
    pub vps_ids: Vec<VpsId>,
    pub last_visited_by_eve: Option<DateTime<Utc>>,
}

impl AccountFields {
    /// Current value of a stored column. Derived attributes read as `Null`.
    pub fn get(&self, column: Attribute) -> FieldValue {
        use Attribute as A;
        match column {
            A::AdwordsId => FieldValue::Text(self.adwords_id.clone()),
            A::Nickname => self.nickname.clone().into(),
            A::Status => FieldValue::Text(self.status.as_str().to_string()),
            A::AccountBudget => self.budget.account_budget.into(),
            A::AccountBudgetOverride => self.budget.account_budget_override.into(),
            A::RemainingAccountBudget => self.budget.remaining_account_budget.into(),
            A::RemainingAccountBudgetOverride => self.budget.remaining_account_budget_override.into(),
            A::DailyBudget => self.budget.daily_budget.into(),
            A::ExchangeRate => self.budget.exchange_rate.into(),
            A::Currency => self.currency.clone().into(),
            A::IsUnlimited => self.is_unlimited.into(),
            A::AutoTagOn => self.auto_tag_on.into(),
            A::Batch => self.batch.clone().into(),
            A::Login => self.login.clone().into(),
            A::Password => self.password.clone().into(),
            A::ExternalComment => self.external_comment.clone().into(),
            A::InternalComment => self.internal_comment.clone().into(),
            A::ClientId => self.client_id.map(|id| FieldValue::Id(id.get())).unwrap_or_default(),
            A::VendorId => self.vendor_id.map(|id| FieldValue::Id(id.get())).unwrap_or_default(),
            A::Vpss => FieldValue::Ids(self.vps_ids.iter().map(|id| id.get()).collect()),
            A::LastVisitedByEve => self.last_visited_by_eve.into(),
            A::Client
            | A::ClientsAllowed
            | A::CreatedAt
            | A::PercentageSpent
            | A::DaysLeft
            | A::Spent
            | A::SpentInHkd
            | A::RemainingInHkd
            | A::Vendor
            | A::DaysToTopup => FieldValue::Null,
        }
    }

    /// Store a value. Values that don't fit the column clear it; callers
    /// check [`FieldValue::fits`] before emitting events.
    pub fn set(&mut self, column: Attribute, value: &FieldValue) {
        use Attribute as A;
        let text = || value.as_text().map(str::to_string);
        match column {
            A::AdwordsId => self.adwords_id = text().unwrap_or_default(),
            A::Nickname => self.nickname = text(),
            A::Status => {
                self.status = value
                    .as_text()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default();
            }
            A::AccountBudget => self.budget.account_budget = value.as_number(),
            A::AccountBudgetOverride => self.budget.account_budget_override = value.as_number(),
            A::RemainingAccountBudget => self.budget.remaining_account_budget = value.as_number(),
            A::RemainingAccountBudgetOverride => {
                self.budget.remaining_account_budget_override = value.as_number()
            }
            A::DailyBudget => self.budget.daily_budget = value.as_number(),
            A::ExchangeRate => self.budget.exchange_rate = value.as_number(),
            A::Currency => self.currency = text(),
            A::IsUnlimited => self.is_unlimited = value.as_flag().unwrap_or(false),
            A::AutoTagOn => self.auto_tag_on = value.as_flag().unwrap_or(false),
            A::Batch => self.batch = text(),
            A::Login => self.login = text(),
            A::Password => self.password = text(),
            A::ExternalComment => self.external_comment = text(),
            A::InternalComment => self.internal_comment = text(),
            A::ClientId => self.client_id = value.as_id().map(UserId::new),
            A::VendorId => self.vendor_id = value.as_id().map(VendorId::new),
            A::Vpss => {
                self.vps_ids = value
                    .as_ids()
                    .map(|ids| ids.iter().copied().map(VpsId::new).collect())
                    .unwrap_or_default();
            }
            A::LastVisitedByEve => self.last_visited_by_eve = value.as_time(),
            _ => {}
        }
    }
}

/// Aggregate root: Account.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: AccountId,
    fields: AccountFields,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Account {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: AccountId) -> Self {
        Self {
            id,
            fields: AccountFields::default(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn fields(&self) -> &AccountFields {
        &self.fields
    }

    pub fn adwords_id(&self) -> &str {
        &self.fields.adwords_id
    }

    pub fn status(&self) -> AccountStatus {
        self.fields.status
    }

    pub fn budget(&self) -> &BudgetFigures {
        &self.fields.budget
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn get(&self, column: Attribute) -> FieldValue {
        self.fields.get(column)
    }
}

impl AggregateRoot for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateAccount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAccount {
    pub account_id: AccountId,
    /// Stored column → value. Missing columns start empty.
    pub values: BTreeMap<Attribute, FieldValue>,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateAccount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAccount {
    pub account_id: AccountId,
    /// Only the columns being written.
    pub values: BTreeMap<Attribute, FieldValue>,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordIngestion. Figures scraped by the ingestion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordIngestion {
    pub account_id: AccountId,
    pub nickname: Option<String>,
    pub currency: String,
    pub account_budget: f64,
    pub remaining_account_budget: f64,
    pub daily_budget: f64,
    pub is_unlimited: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteAccount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAccount {
    pub account_id: AccountId,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountCommand {
    Create(CreateAccount),
    Update(UpdateAccount),
    RecordIngestion(RecordIngestion),
    Delete(DeleteAccount),
}

impl AccountCommand {
    pub fn account_id(&self) -> AccountId {
        match self {
            AccountCommand::Create(c) => c.account_id,
            AccountCommand::Update(c) => c.account_id,
            AccountCommand::RecordIngestion(c) => c.account_id,
            AccountCommand::Delete(c) => c.account_id,
        }
    }
}

/// One column changed by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub column: Attribute,
    pub before: FieldValue,
    pub after: FieldValue,
}

/// Event: AccountCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub account_id: AccountId,
    pub changes: Vec<FieldChange>,
    /// `None` when written by the ingestion job.
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AccountUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdated {
    pub account_id: AccountId,
    pub changes: Vec<FieldChange>,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AccountDeleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDeleted {
    pub account_id: AccountId,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
    AccountCreated(AccountCreated),
    AccountUpdated(AccountUpdated),
    AccountDeleted(AccountDeleted),
}

impl AccountEvent {
    pub fn changes(&self) -> &[FieldChange] {
        match self {
            AccountEvent::AccountCreated(e) => &e.changes,
            AccountEvent::AccountUpdated(e) => &e.changes,
            AccountEvent::AccountDeleted(_) => &[],
        }
    }

    pub fn actor(&self) -> Option<UserId> {
        match self {
            AccountEvent::AccountCreated(e) => e.actor,
            AccountEvent::AccountUpdated(e) => e.actor,
            AccountEvent::AccountDeleted(e) => e.actor,
        }
    }

    pub fn account_id(&self) -> AccountId {
        match self {
            AccountEvent::AccountCreated(e) => e.account_id,
            AccountEvent::AccountUpdated(e) => e.account_id,
            AccountEvent::AccountDeleted(e) => e.account_id,
        }
    }
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountCreated(_) => "accounts.account.created",
            AccountEvent::AccountUpdated(_) => "accounts.account.updated",
            AccountEvent::AccountDeleted(_) => "accounts.account.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::AccountCreated(e) => e.occurred_at,
            AccountEvent::AccountUpdated(e) => e.occurred_at,
            AccountEvent::AccountDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::AccountCreated(e) => {
                self.id = e.account_id;
                self.fields = AccountFields::default();
                for change in &e.changes {
                    self.fields.set(change.column, &change.after);
                }
                self.created = true;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            AccountEvent::AccountUpdated(e) => {
                for change in &e.changes {
                    self.fields.set(change.column, &change.after);
                }
                self.updated_at = Some(e.occurred_at);
            }
            AccountEvent::AccountDeleted(e) => {
                self.deleted = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Create(cmd) => self.handle_create(cmd),
            AccountCommand::Update(cmd) => self.handle_update(cmd),
            AccountCommand::RecordIngestion(cmd) => self.handle_ingestion(cmd),
            AccountCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Account {
    fn ensure_account_id(&self, account_id: AccountId) -> Result<(), DomainError> {
        if self.id != account_id {
            return Err(DomainError::invariant("account_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    /// Kind and format checks on submitted column values.
    fn check_values(values: &BTreeMap<Attribute, FieldValue>) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        for (column, value) in values {
            let Some(kind) = column.kind() else {
                errors.add(column.name(), "Not a stored column.");
                continue;
            };
            if !value.fits(kind) {
                errors.add(column.name(), "Invalid value.");
                continue;
            }
            match column {
                Attribute::AdwordsId => match value.as_text() {
                    Some(id) => {
                        if let Err(msg) = check_adwords_id(id) {
                            errors.add(column.name(), msg);
                        }
                    }
                    None => errors.add(column.name(), "This field is required."),
                },
                Attribute::Status if value.is_null() => {
                    errors.add(column.name(), "This field is required.");
                }
                _ if kind == ValueKind::Ids && value.is_null() => {
                    errors.add(column.name(), "Invalid value.");
                }
                _ => {}
            }
        }
        errors.into_result()
    }

    fn diff(&self, values: &BTreeMap<Attribute, FieldValue>) -> Vec<FieldChange> {
        values
            .iter()
            .filter_map(|(column, after)| {
                let before = self.fields.get(*column);
                (before != *after).then(|| FieldChange {
                    column: *column,
                    before,
                    after: after.clone(),
                })
            })
            .collect()
    }

    fn handle_create(&self, cmd: &CreateAccount) -> Result<Vec<AccountEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("account already exists"));
        }
        self.ensure_account_id(cmd.account_id)?;

        let mut values = cmd.values.clone();
        if !values.contains_key(&Attribute::AdwordsId) {
            let mut errors = FieldErrors::new();
            errors.add(Attribute::AdwordsId.name(), "This field is required.");
            return Err(DomainError::Fields(errors));
        }
        values
            .entry(Attribute::Status)
            .or_insert_with(|| FieldValue::Text(AccountStatus::default().as_str().to_string()));
        Self::check_values(&values)?;

        let changes = values
            .into_iter()
            .filter(|(column, value)| match column.kind() {
                Some(ValueKind::Flag) => value.as_flag() == Some(true),
                Some(ValueKind::Ids) => !value.is_blank(),
                _ => !value.is_null(),
            })
            .map(|(column, after)| FieldChange {
                column,
                before: FieldValue::Null,
                after,
            })
            .collect();

        Ok(vec![AccountEvent::AccountCreated(AccountCreated {
            account_id: cmd.account_id,
            changes,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_account_id(cmd.account_id)?;
        Self::check_values(&cmd.values)?;

        let changes = self.diff(&cmd.values);
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![AccountEvent::AccountUpdated(AccountUpdated {
            account_id: cmd.account_id,
            changes,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ingestion(&self, cmd: &RecordIngestion) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_account_id(cmd.account_id)?;

        let figures = [cmd.account_budget, cmd.remaining_account_budget, cmd.daily_budget];
        if figures.iter().any(|f| !f.is_finite()) {
            return Err(DomainError::validation("budget figures must be finite"));
        }

        let mut values = BTreeMap::new();
        if let Some(nickname) = &cmd.nickname {
            values.insert(Attribute::Nickname, FieldValue::Text(nickname.clone()));
        }
        values.insert(Attribute::Currency, FieldValue::Text(cmd.currency.clone()));
        values.insert(Attribute::AccountBudget, FieldValue::Number(cmd.account_budget));
        values.insert(
            Attribute::RemainingAccountBudget,
            FieldValue::Number(cmd.remaining_account_budget),
        );
        values.insert(Attribute::DailyBudget, FieldValue::Number(cmd.daily_budget));
        // Ingestion only ever raises the flag; clearing it is a manual edit.
        if cmd.is_unlimited {
            values.insert(Attribute::IsUnlimited, FieldValue::Flag(true));
        }
        values.insert(Attribute::LastVisitedByEve, FieldValue::Time(cmd.occurred_at));

        Ok(vec![AccountEvent::AccountUpdated(AccountUpdated {
            account_id: cmd.account_id,
            changes: self.diff(&values),
            actor: None,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_account_id(cmd.account_id)?;

        Ok(vec![AccountEvent::AccountDeleted(AccountDeleted {
            account_id: cmd.account_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account_id() -> AccountId {
        AccountId::new(7)
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn created_account() -> Account {
        let mut account = Account::empty(test_account_id());
        let mut values = BTreeMap::new();
        values.insert(Attribute::AdwordsId, text("123-456-7890"));
        values.insert(Attribute::Login, text("ops@example.com"));
        values.insert(Attribute::AccountBudget, FieldValue::Number(1000.0));
        values.insert(Attribute::Vpss, FieldValue::Ids(vec![2, 3]));
        let events = account
            .handle(&AccountCommand::Create(CreateAccount {
                account_id: test_account_id(),
                values,
                actor: Some(UserId::new(1)),
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            account.apply(e);
        }
        account
    }

    #[test]
    fn create_emits_changes_for_set_columns() {
        let account = created_account();
        assert!(account.exists());
        assert_eq!(account.version(), 1);
        assert_eq!(account.adwords_id(), "123-456-7890");
        assert_eq!(account.status(), AccountStatus::Uninitialized);
        assert_eq!(account.fields().vps_ids, vec![VpsId::new(2), VpsId::new(3)]);
        assert_eq!(account.budget().account_budget, Some(1000.0));
        assert!(account.created_at().is_some());
    }

    #[test]
    fn create_requires_valid_adwords_id() {
        let account = Account::empty(test_account_id());
        let mut values = BTreeMap::new();
        values.insert(Attribute::AdwordsId, text("1234567890"));
        let err = account
            .handle(&AccountCommand::Create(CreateAccount {
                account_id: test_account_id(),
                values,
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        let DomainError::Fields(errors) = err else {
            panic!("expected field errors");
        };
        assert_eq!(
            errors.get("adwords_id"),
            Some(&["Adwords ID must be in the format of 123-456-7890.".to_string()][..])
        );
    }

    #[test]
    fn create_twice_conflicts() {
        let account = created_account();
        let mut values = BTreeMap::new();
        values.insert(Attribute::AdwordsId, text("123-456-7890"));
        let err = account
            .handle(&AccountCommand::Create(CreateAccount {
                account_id: test_account_id(),
                values,
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn update_records_before_and_after() {
        let account = created_account();
        let mut values = BTreeMap::new();
        values.insert(Attribute::Status, text("active"));
        values.insert(Attribute::Login, text("ops@example.com"));
        let events = account
            .handle(&AccountCommand::Update(UpdateAccount {
                account_id: test_account_id(),
                values,
                actor: Some(UserId::new(2)),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].changes(),
            &[FieldChange {
                column: Attribute::Status,
                before: text("uninitialized"),
                after: text("active"),
            }]
        );
        assert_eq!(events[0].actor(), Some(UserId::new(2)));
    }

    #[test]
    fn unchanged_update_emits_nothing() {
        let account = created_account();
        let mut values = BTreeMap::new();
        values.insert(Attribute::AccountBudget, FieldValue::Number(1000.0));
        let events = account
            .handle(&AccountCommand::Update(UpdateAccount {
                account_id: test_account_id(),
                values,
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn update_rejects_values_of_the_wrong_kind() {
        let account = created_account();
        let mut values = BTreeMap::new();
        values.insert(Attribute::DailyBudget, text("lots"));
        values.insert(Attribute::Spent, FieldValue::Number(1.0));
        let err = account
            .handle(&AccountCommand::Update(UpdateAccount {
                account_id: test_account_id(),
                values,
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        let DomainError::Fields(errors) = err else {
            panic!("expected field errors");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["daily_budget", "spent"]);
    }

    #[test]
    fn ingestion_is_attributed_to_no_user() {
        let mut account = created_account();
        let now = test_time();
        let events = account
            .handle(&AccountCommand::RecordIngestion(RecordIngestion {
                account_id: test_account_id(),
                nickname: Some("Shop A".into()),
                currency: "$".into(),
                account_budget: 1000.0,
                remaining_account_budget: 250.0,
                daily_budget: 50.0,
                is_unlimited: false,
                occurred_at: now,
            }))
            .unwrap();
        assert_eq!(events[0].actor(), None);
        let columns: Vec<_> = events[0].changes().iter().map(|c| c.column).collect();
        assert!(columns.contains(&Attribute::LastVisitedByEve));
        assert!(!columns.contains(&Attribute::AccountBudget));
        for e in &events {
            account.apply(e);
        }
        assert_eq!(account.fields().last_visited_by_eve, Some(now));
        assert_eq!(account.budget().days_left(), 5);
    }

    #[test]
    fn deleted_account_rejects_further_commands() {
        let mut account = created_account();
        let events = account
            .handle(&AccountCommand::Delete(DeleteAccount {
                account_id: test_account_id(),
                actor: Some(UserId::new(1)),
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            account.apply(e);
        }
        assert!(account.is_deleted());
        assert!(!account.exists());

        let err = account
            .handle(&AccountCommand::Update(UpdateAccount {
                account_id: test_account_id(),
                values: BTreeMap::new(),
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn update_on_missing_account_is_not_found() {
        let account = Account::empty(test_account_id());
        let err = account
            .handle(&AccountCommand::Update(UpdateAccount {
                account_id: test_account_id(),
                values: BTreeMap::new(),
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn event_types_are_namespaced() {
        let account = created_account();
        let events = account
            .handle(&AccountCommand::Delete(DeleteAccount {
                account_id: test_account_id(),
                actor: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events[0].event_type(), "accounts.account.deleted");
    }
}
