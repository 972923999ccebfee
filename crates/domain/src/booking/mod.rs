//! Booking aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Booking;
pub use commands::*;
pub use events::{
    BookingCancelledData, BookingCreatedData, BookingEvent, BookingExpiredData, BookingPaidData,
    BookingRefundedData, CombosReplacedData, PointsRedeemedData,
};
pub use service::{BookingService, MAX_HOLD_ATTEMPTS};
pub use state::BookingState;
pub use value_objects::{
    BookedSeat, ComboLine, IssuedTicket, Money, POINT_VALUE_MINOR, ScreeningRef,
    loyalty_points_earned,
};

use thiserror::Error;

use crate::seating::SeatId;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Booking is already created.
    #[error("Booking already created")]
    AlreadyCreated,

    /// A booking must cover between one and eight seats.
    #[error("Invalid seat count: {count} (must be between 1 and 8)")]
    InvalidSeatCount { count: usize },

    /// The operation is not legal in the booking's current state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: BookingState,
        action: &'static str,
    },

    /// The hold window has lapsed; the booking can only expire now.
    #[error("Booking hold has expired")]
    HoldLapsed,

    /// The hold window has not lapsed yet, so the booking cannot expire.
    #[error("Booking hold is still active")]
    HoldStillActive,

    /// Guest bookings cannot redeem loyalty points.
    #[error("Point redemption requires a registered customer")]
    GuestCannotRedeem,

    /// The customer's balance does not cover the requested points.
    #[error("Insufficient points: requested {requested}, balance {balance}")]
    InsufficientPoints { requested: i64, balance: i64 },

    /// The discount would exceed half of the pre-discount total.
    #[error("Discount {discount} exceeds 50% of the pre-discount total {subtotal}")]
    DiscountExceedsCap { discount: Money, subtotal: Money },

    /// A seat appears twice in the selection.
    #[error("Duplicate seat in selection: {seat_id}")]
    DuplicateSeat { seat_id: SeatId },
}
