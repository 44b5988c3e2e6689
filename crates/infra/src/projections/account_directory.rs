//! Account directory projection.
//!
//! Folds the account event streams into current account state plus the
//! typed history each account screen renders. Rebuildable from the event
//! store and idempotent per stream: envelopes at or below the stream cursor
//! are ignored.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::anyhow;
use serde_json::Value as JsonValue;

use adportal_accounts::{Account, AccountEvent};
use adportal_core::{AccountId, Aggregate, AggregateId};
use adportal_events::EventEnvelope;

use crate::event_store::{EventStore, StoredEvent};

/// Aggregate type of account streams.
pub const ACCOUNT_AGGREGATE: &str = "accounts.account";

// ─────────────────────────────────────────────────────────────────────────────
// Read Model
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Directory {
    accounts: BTreeMap<AccountId, Account>,
    history: BTreeMap<AccountId, Vec<EventEnvelope<AccountEvent>>>,
    cursors: HashMap<AggregateId, u64>,
    last_id: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Projection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AccountDirectory {
    inner: RwLock<Directory>,
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != ACCOUNT_AGGREGATE {
            return Ok(());
        }

        let event: AccountEvent = serde_json::from_value(envelope.payload().clone())?;
        let mut dir = self.inner.write().map_err(|_| anyhow!("account directory lock poisoned"))?;

        let stream = envelope.aggregate_id();
        let cursor = dir.cursors.get(&stream).copied().unwrap_or(0);
        if envelope.sequence_number() <= cursor {
            return Ok(());
        }

        let id = event.account_id();
        dir.last_id = dir.last_id.max(id.get());
        dir.accounts
            .entry(id)
            .or_insert_with(|| Account::empty(id))
            .apply(&event);
        dir.history
            .entry(id)
            .or_default()
            .push(envelope.clone().map(|_| event));
        dir.cursors.insert(stream, envelope.sequence_number());
        Ok(())
    }

    pub fn apply_stored(&self, events: &[StoredEvent]) -> Result<(), anyhow::Error> {
        for stored in events {
            self.apply_envelope(&stored.to_envelope())?;
        }
        Ok(())
    }

    /// Drop everything and replay every account stream from `store`.
    pub async fn rebuild(&self, store: &impl EventStore) -> Result<usize, anyhow::Error> {
        let events = store.load_all(ACCOUNT_AGGREGATE).await?;
        {
            let mut dir = self.inner.write().map_err(|_| anyhow!("account directory lock poisoned"))?;
            *dir = Directory::default();
        }
        self.apply_stored(&events)?;
        Ok(events.len())
    }

    /// Next unused account id.
    pub fn next_id(&self) -> AccountId {
        let last = self.inner.read().map(|d| d.last_id).unwrap_or(0);
        AccountId::new(last + 1)
    }

    /// A live (created, not deleted) account.
    pub fn get(&self, id: AccountId) -> Option<Account> {
        let dir = self.inner.read().ok()?;
        dir.accounts.get(&id).filter(|a| a.exists()).cloned()
    }

    /// Live accounts in id order.
    pub fn list(&self) -> Vec<Account> {
        match self.inner.read() {
            Ok(dir) => dir.accounts.values().filter(|a| a.exists()).cloned().collect(),
            Err(_) => vec![],
        }
    }

    pub fn find_by_adwords_id(&self, adwords_id: &str) -> Option<Account> {
        let dir = self.inner.read().ok()?;
        dir.accounts
            .values()
            .find(|a| a.exists() && a.adwords_id() == adwords_id)
            .cloned()
    }

    pub fn adwords_id_taken(&self, adwords_id: &str, except: Option<AccountId>) -> bool {
        self.find_by_adwords_id(adwords_id)
            .is_some_and(|a| Some(a.id_typed()) != except)
    }

    /// Event history of one account, oldest first.
    pub fn history(&self, id: AccountId) -> Vec<EventEnvelope<AccountEvent>> {
        match self.inner.read() {
            Ok(dir) => dir.history.get(&id).cloned().unwrap_or_default(),
            Err(_) => vec![],
        }
    }

    /// Every account event, oldest first.
    pub fn all_history(&self) -> Vec<EventEnvelope<AccountEvent>> {
        let mut all: Vec<_> = match self.inner.read() {
            Ok(dir) => dir.history.values().flatten().cloned().collect(),
            Err(_) => vec![],
        };
        all.sort_by_key(|e| e.occurred_at());
        all
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use adportal_accounts::{AccountCommand, Attribute, CreateAccount, DeleteAccount, FieldValue};

    use super::*;
    use crate::command_dispatcher::CommandDispatcher;
    use crate::event_store::InMemoryEventStore;

    fn create(id: i64, adwords_id: &str) -> AccountCommand {
        AccountCommand::Create(CreateAccount {
            account_id: AccountId::new(id),
            values: BTreeMap::from([(Attribute::AdwordsId, FieldValue::Text(adwords_id.into()))]),
            actor: None,
            occurred_at: Utc::now(),
        })
    }

    fn empty(id: AggregateId) -> Account {
        Account::empty(AccountId::new(id.get()))
    }

    #[tokio::test]
    async fn projection_tracks_dispatched_commands() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let directory = AccountDirectory::new();

        for (id, adwords) in [(1, "111-111-1111"), (2, "222-222-2222")] {
            let committed = dispatcher
                .dispatch(AggregateId::new(id), ACCOUNT_AGGREGATE, create(id, adwords), empty)
                .await
                .unwrap();
            directory.apply_stored(&committed).unwrap();
        }

        assert_eq!(directory.list().len(), 2);
        assert_eq!(directory.next_id(), AccountId::new(3));
        assert!(directory.adwords_id_taken("111-111-1111", None));
        assert!(!directory.adwords_id_taken("111-111-1111", Some(AccountId::new(1))));

        let deleted = dispatcher
            .dispatch(
                AggregateId::new(1),
                ACCOUNT_AGGREGATE,
                AccountCommand::Delete(DeleteAccount {
                    account_id: AccountId::new(1),
                    actor: None,
                    occurred_at: Utc::now(),
                }),
                empty,
            )
            .await
            .unwrap();
        directory.apply_stored(&deleted).unwrap();

        assert!(directory.get(AccountId::new(1)).is_none());
        assert_eq!(directory.history(AccountId::new(1)).len(), 2);
        assert_eq!(directory.next_id(), AccountId::new(3));
    }

    #[tokio::test]
    async fn replays_are_idempotent_and_rebuild_matches() {
        let store = InMemoryEventStore::new();
        let dispatcher = CommandDispatcher::new(store);
        let directory = AccountDirectory::new();
        let committed = dispatcher
            .dispatch(AggregateId::new(5), ACCOUNT_AGGREGATE, create(5, "555-555-5555"), empty)
            .await
            .unwrap();

        directory.apply_stored(&committed).unwrap();
        directory.apply_stored(&committed).unwrap();
        assert_eq!(directory.history(AccountId::new(5)).len(), 1);

        let rebuilt = AccountDirectory::new();
        assert_eq!(rebuilt.rebuild(dispatcher.store()).await.unwrap(), 1);
        assert_eq!(rebuilt.list(), directory.list());
        assert_eq!(rebuilt.all_history().len(), 1);
    }
}
