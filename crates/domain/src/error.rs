//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::booking::BookingError;
use crate::catalog::CatalogError;
use crate::loyalty::LoyaltyError;
use crate::seating::SeatingError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A booking command was rejected.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// A seating command was rejected.
    #[error("Seating error: {0}")]
    Seating(#[from] SeatingError),

    /// A catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A loyalty-service call failed.
    #[error("Loyalty error: {0}")]
    Loyalty(#[from] LoyaltyError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when the error is the benign "someone else won the race" case.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })
        )
    }
}
