//! Domain layer for the seat-reservation and booking-settlement engine.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits plus the generic CommandHandler
//! - The Booking aggregate: hold lifecycle, totals, combos, point redemption
//! - The ScreeningSeating aggregate: per-screening seat inventory with
//!   atomic holds and the orphan-seat layout check
//! - The read-only Catalog boundary (screenings, seat layouts, price rules)
//! - The LoyaltyService boundary (point balances and adjustments)

pub mod aggregate;
pub mod booking;
pub mod catalog;
pub mod command;
pub mod error;
pub mod loyalty;
pub mod seating;

pub use aggregate::{Aggregate, DomainEvent};
pub use booking::{
    BookedSeat, Booking, BookingError, BookingEvent, BookingService, BookingState, CancelBooking,
    ComboLine, ComboSelection, ConfirmPayment, HoldSeats, IssuedTicket, Money, RedeemPoints,
    RefundBooking, ScreeningRef, SetCombos, loyalty_points_earned,
};
pub use catalog::{
    Catalog, CatalogError, ComboInfo, DayType, InMemoryCatalog, PriceRule, ScreeningInfo, TimeSlot,
};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use loyalty::{InMemoryLoyaltyService, LoyaltyError, LoyaltyService};
pub use seating::{
    OrphanViolation, RowOccupancy, ScreeningSeat, ScreeningSeating, SeatId, SeatSpec, SeatStatus,
    SeatType, SeatingError, SeatingEvent, Slot, validate_selection,
};
