//! Booking commands.

use common::{AggregateId, CustomerId, ScreeningId};
use uuid::Uuid;

use crate::command::Command;
use crate::seating::SeatId;

use super::Booking;

/// Command to hold seats and open a booking.
#[derive(Debug, Clone)]
pub struct HoldSeats {
    /// The booking ID to create.
    pub booking_id: AggregateId,

    /// The screening to book.
    pub screening_id: ScreeningId,

    /// The seats to claim.
    pub seat_ids: Vec<SeatId>,

    /// The customer, or None for a guest booking.
    pub customer: Option<CustomerId>,
}

impl HoldSeats {
    /// Creates a new HoldSeats command with a generated booking ID.
    pub fn new(
        screening_id: ScreeningId,
        seat_ids: Vec<SeatId>,
        customer: Option<CustomerId>,
    ) -> Self {
        Self {
            booking_id: AggregateId::new(),
            screening_id,
            seat_ids,
            customer,
        }
    }
}

impl Command for HoldSeats {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// One combo selection in a combo update request.
#[derive(Debug, Clone)]
pub struct ComboSelection {
    pub combo_id: String,
    pub quantity: u32,
}

/// Command to replace a booking's combo line items.
#[derive(Debug, Clone)]
pub struct SetCombos {
    pub booking_id: AggregateId,
    pub selections: Vec<ComboSelection>,
}

impl SetCombos {
    /// Creates a new SetCombos command.
    pub fn new(booking_id: AggregateId, selections: Vec<ComboSelection>) -> Self {
        Self {
            booking_id,
            selections,
        }
    }
}

impl Command for SetCombos {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to redeem loyalty points into a discount.
#[derive(Debug, Clone)]
pub struct RedeemPoints {
    pub booking_id: AggregateId,
    pub points: i64,
}

impl RedeemPoints {
    /// Creates a new RedeemPoints command.
    pub fn new(booking_id: AggregateId, points: i64) -> Self {
        Self { booking_id, points }
    }
}

impl Command for RedeemPoints {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to cancel a held booking.
#[derive(Debug, Clone)]
pub struct CancelBooking {
    pub booking_id: AggregateId,
}

impl CancelBooking {
    /// Creates a new CancelBooking command.
    pub fn new(booking_id: AggregateId) -> Self {
        Self { booking_id }
    }
}

impl Command for CancelBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to confirm a settled payment against a booking.
#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    pub booking_id: AggregateId,
    pub payment_id: Uuid,
}

impl ConfirmPayment {
    /// Creates a new ConfirmPayment command.
    pub fn new(booking_id: AggregateId, payment_id: Uuid) -> Self {
        Self {
            booking_id,
            payment_id,
        }
    }
}

impl Command for ConfirmPayment {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to refund a paid booking.
#[derive(Debug, Clone)]
pub struct RefundBooking {
    pub booking_id: AggregateId,
}

impl RefundBooking {
    /// Creates a new RefundBooking command.
    pub fn new(booking_id: AggregateId) -> Self {
        Self { booking_id }
    }
}

impl Command for RefundBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}
