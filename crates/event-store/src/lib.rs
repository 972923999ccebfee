//! Event store for the seat-reservation and settlement engine.
//!
//! Every state transition in the engine is an event appended with an
//! expected-version check. That check is the single concurrency-correctness
//! mechanism: two writers racing on the same aggregate cannot both commit,
//! so seat holds and booking transitions are first-writer-wins by
//! construction.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStream};
