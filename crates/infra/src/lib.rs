//! Infrastructure layer: event store backends, command dispatch, record
//! stores and read-model projections.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
#[cfg(feature = "postgres")]
pub use event_store::PostgresEventStore;
pub use projections::{AccountDirectory, ACCOUNT_AGGREGATE};
pub use read_model::{EntityStore, InMemoryEntityStore};
