//! Booking state machine.

use serde::{Deserialize, Serialize};

/// The state of a booking in its lifecycle.
///
/// State transitions:
/// ```text
/// Hold ──┬──► Paid ──► Refunded
///        ├──► Cancelled
///        └──► Expired
/// ```
///
/// Any transition not in this table is rejected loudly, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookingState {
    /// Seats are held; totals may still change (combos, points).
    #[default]
    Hold,

    /// Payment settled; seats sold and tickets issued.
    Paid,

    /// Cancelled by the customer while on hold (terminal state).
    Cancelled,

    /// The hold lapsed and the sweeper reclaimed the seats (terminal state).
    Expired,

    /// A paid booking was refunded and its effects reversed (terminal state).
    Refunded,
}

impl BookingState {
    /// Returns true if totals can still be mutated (combos, points).
    pub fn can_modify(&self) -> bool {
        matches!(self, BookingState::Hold)
    }

    /// Returns true if payment can be confirmed in this state.
    pub fn can_pay(&self) -> bool {
        matches!(self, BookingState::Hold)
    }

    /// Returns true if the booking can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingState::Hold)
    }

    /// Returns true if the sweeper may expire the booking in this state.
    pub fn can_expire(&self) -> bool {
        matches!(self, BookingState::Hold)
    }

    /// Returns true if the booking can be refunded in this state.
    pub fn can_refund(&self) -> bool {
        matches!(self, BookingState::Paid)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingState::Cancelled | BookingState::Expired | BookingState::Refunded
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Hold => "Hold",
            BookingState::Paid => "Paid",
            BookingState::Cancelled => "Cancelled",
            BookingState::Expired => "Expired",
            BookingState::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
