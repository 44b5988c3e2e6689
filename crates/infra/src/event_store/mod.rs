//! Append-only event store boundary.
//!
//! Account history is event-sourced; this module stores and loads those
//! streams without making storage assumptions. The in-memory store is the
//! default backend, Postgres sits behind the `postgres` feature.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
