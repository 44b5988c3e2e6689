//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//! ```
//!
//! The committed events are returned to the caller, which feeds them to the
//! read models. This module contains no IO itself; it composes the
//! `EventStore` trait.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use adportal_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, FieldErrors};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale aggregate version) or a domain conflict.
    #[error("conflict: {0}")]
    Concurrency(String),
    /// Domain validation failure (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Field-level validation failure.
    #[error("validation failed: {0}")]
    Fields(FieldErrors),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    /// Historical payloads did not decode into the aggregate's event type.
    #[error("failed to decode stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::Decode(msg) => DispatchError::Deserialize(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::Fields(fields) => DispatchError::Fields(fields),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Each dispatch appends with `ExpectedVersion::Exact(loaded version)`, so a
/// write racing another on the same aggregate fails with
/// [`DispatchError::Concurrency`] instead of silently interleaving.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Load, rehydrate, decide and persist.
    ///
    /// Returns the committed events; empty when the command decided nothing
    /// (a no-op update), in which case nothing is written.
    pub async fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: adportal_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id).await?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.store.append(uncommitted, expected).await?)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event =
            serde_json::from_value(stored.payload.clone()).map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use adportal_accounts::{
        Account, AccountCommand, Attribute, CreateAccount, FieldValue, UpdateAccount,
    };
    use adportal_core::{AccountId, AggregateRoot};

    use super::*;
    use crate::event_store::InMemoryEventStore;

    const TYPE: &str = "accounts.account";

    fn create(id: i64) -> AccountCommand {
        AccountCommand::Create(CreateAccount {
            account_id: AccountId::new(id),
            values: BTreeMap::from([(Attribute::AdwordsId, FieldValue::Text("123-456-7890".into()))]),
            actor: None,
            occurred_at: Utc::now(),
        })
    }

    fn rename(id: i64, nickname: &str) -> AccountCommand {
        AccountCommand::Update(UpdateAccount {
            account_id: AccountId::new(id),
            values: BTreeMap::from([(Attribute::Nickname, FieldValue::Text(nickname.into()))]),
            actor: None,
            occurred_at: Utc::now(),
        })
    }

    fn empty(id: AggregateId) -> Account {
        Account::empty(AccountId::new(id.get()))
    }

    #[tokio::test]
    async fn dispatch_persists_and_rehydrates() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let id = AggregateId::new(1);

        let created = dispatcher.dispatch(id, TYPE, create(1), empty).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].event_type, "accounts.account.created");

        let updated = dispatcher.dispatch(id, TYPE, rename(1, "Shop"), empty).await.unwrap();
        assert_eq!(updated[0].sequence_number, 2);

        let history = dispatcher.store().load_stream(id).await.unwrap();
        let mut account = empty(id);
        apply_history(&mut account, &history).unwrap();
        assert_eq!(account.version(), 2);
        assert_eq!(account.fields().nickname.as_deref(), Some("Shop"));
    }

    #[tokio::test]
    async fn no_op_update_writes_nothing() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let id = AggregateId::new(1);
        dispatcher.dispatch(id, TYPE, create(1), empty).await.unwrap();
        dispatcher.dispatch(id, TYPE, rename(1, "Shop"), empty).await.unwrap();

        let again = dispatcher.dispatch(id, TYPE, rename(1, "Shop"), empty).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(dispatcher.store().load_stream(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn domain_errors_map_to_dispatch_errors() {
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
        let id = AggregateId::new(7);

        let err = dispatcher.dispatch(id, TYPE, rename(7, "x"), empty).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));

        dispatcher.dispatch(id, TYPE, create(7), empty).await.unwrap();
        let err = dispatcher.dispatch(id, TYPE, create(7), empty).await.unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }
}
