use std::collections::BTreeMap;
use std::sync::RwLock;

use adportal_core::{AggregateId, ExpectedVersion};

use super::r#trait::{single_stream, EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// The default backend; also used by tests. Streams are kept in id order so
/// `load_all` is deterministic.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<BTreeMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        let (aggregate_id, aggregate_type) = single_stream(&events)?;

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        let stream = streams.entry(aggregate_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn load_all(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        Ok(streams
            .values()
            .flatten()
            .filter(|e| e.aggregate_type == aggregate_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn event(aggregate: i64, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id: AggregateId::new(aggregate),
            aggregate_type: aggregate_type.to_string(),
            event_type: "accounts.account.updated".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn assigns_monotonic_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let first = store
            .append(vec![event(1, "accounts.account"), event(1, "accounts.account")], ExpectedVersion::Exact(0))
            .await
            .unwrap();
        assert_eq!(first.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2]);

        let next = store
            .append(vec![event(1, "accounts.account")], ExpectedVersion::Exact(2))
            .await
            .unwrap();
        assert_eq!(next[0].sequence_number, 3);
        assert_eq!(store.load_stream(AggregateId::new(1)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        store
            .append(vec![event(1, "accounts.account")], ExpectedVersion::Exact(0))
            .await
            .unwrap();
        let err = store
            .append(vec![event(1, "accounts.account")], ExpectedVersion::Exact(0))
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[tokio::test]
    async fn mixed_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        let err = store
            .append(vec![event(1, "accounts.account"), event(2, "accounts.account")], ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));

        store
            .append(vec![event(3, "accounts.account")], ExpectedVersion::Any)
            .await
            .unwrap();
        let err = store
            .append(vec![event(3, "vendors.vendor")], ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[tokio::test]
    async fn load_all_filters_by_type_in_stream_order() {
        let store = InMemoryEventStore::new();
        for id in [2, 1] {
            store
                .append(vec![event(id, "accounts.account")], ExpectedVersion::Any)
                .await
                .unwrap();
        }
        store
            .append(vec![event(9, "other")], ExpectedVersion::Any)
            .await
            .unwrap();
        let all = store.load_all("accounts.account").await.unwrap();
        assert_eq!(all.iter().map(|e| e.aggregate_id.get()).collect::<Vec<_>>(), vec![1, 2]);
        assert!(store.load_stream(AggregateId::new(42)).await.unwrap().is_empty());
    }
}
