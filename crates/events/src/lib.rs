//! Domain events and the envelope that carries them out of the event store.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
