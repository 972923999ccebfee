//! Shared identifier types for the cinema ticketing engine.

pub mod types;

pub use types::{AggregateId, CinemaId, CustomerId, MovieId, ScreeningId};
