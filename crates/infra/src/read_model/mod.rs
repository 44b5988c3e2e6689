//! Storage for the plain CRUD records (users, vendors, hosts, ...).

pub mod entity_store;

pub use entity_store::{EntityStore, InMemoryEntityStore};
