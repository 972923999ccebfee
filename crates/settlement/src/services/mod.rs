//! External service boundaries used by settlement.

pub mod notifier;

pub use notifier::{BookingRefundedNotice, InMemoryNotifier, Notifier, TicketsIssuedNotice};
