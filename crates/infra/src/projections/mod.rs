//! Projection implementations (read model builders).
//!
//! Projections consume committed events and build query-optimized read
//! models. They are rebuildable from the event store and idempotent under
//! replays.

pub mod account_directory;

pub use account_directory::{AccountDirectory, ACCOUNT_AGGREGATE};
