//! Read models for the query side of the engine.
//!
//! The revenue ledgers are additive functions of `BookingPaid` and
//! `BookingRefunded` events; they are only ever mutated by replaying those
//! events, never written directly. The active-holds index feeds the
//! expiration sweeper, and the ticket registry backs check-in.

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{
    ActiveHoldsView, DailyRevenueSummary, DailyRevenueView, HoldEntry, MovieRevenue,
    MovieRevenueView, TicketRecord, TicketStatus, TicketsView,
};
