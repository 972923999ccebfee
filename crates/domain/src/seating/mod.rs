//! Per-screening seat inventory: the contended resource.
//!
//! One `ScreeningSeating` aggregate owns every seat of one screening, so a
//! multi-seat hold is a single event committed under one version check —
//! the compare-and-swap that makes overlapping holds first-writer-wins.

mod aggregate;
mod events;
mod orphan;
mod seat;

pub use aggregate::ScreeningSeating;
pub use events::{
    SeatingEvent, SeatingOpenedData, SeatsHeldData, SeatsReleasedData, SeatsSoldData,
};
pub use orphan::{OrphanViolation, RowOccupancy, Slot, validate_selection};
pub use seat::{ScreeningSeat, SeatId, SeatSpec, SeatStatus, SeatType};

use thiserror::Error;

use common::AggregateId;

/// Errors that can occur during seating operations.
#[derive(Debug, Error)]
pub enum SeatingError {
    /// The seating aggregate has not been opened for this screening.
    #[error("Seating not open for this screening")]
    NotOpen,

    /// The seating aggregate was already opened.
    #[error("Seating already open")]
    AlreadyOpen,

    /// A screening must have at least one seat.
    #[error("Seat layout is empty")]
    EmptyLayout,

    /// A requested seat does not exist in this screening.
    #[error("Unknown seat: {seat_id}")]
    UnknownSeat { seat_id: SeatId },

    /// One or more requested seats are not available.
    ///
    /// This is the contention outcome: no partial hold is retained and the
    /// caller should retry with a different selection.
    #[error("Seats unavailable: {}", seats.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "))]
    SeatsUnavailable { seats: Vec<SeatId> },

    /// The selection would strand an unsellable single seat.
    #[error("{0}")]
    Orphan(#[from] OrphanViolation),

    /// The booking holds no seats in this screening.
    #[error("Booking {booking_id} holds no seats")]
    NothingHeld { booking_id: AggregateId },
}
