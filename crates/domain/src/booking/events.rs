//! Booking domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, CinemaId, CustomerId, MovieId, ScreeningId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::DomainEvent;

use super::{BookedSeat, ComboLine, IssuedTicket, Money, ScreeningRef};

/// Events that can occur on a booking aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// Booking was created with its seats held.
    BookingCreated(BookingCreatedData),

    /// Combo line items were replaced wholesale.
    CombosReplaced(CombosReplacedData),

    /// Loyalty points were redeemed into a discount.
    PointsRedeemed(PointsRedeemedData),

    /// Payment settled; seats sold and tickets issued.
    BookingPaid(BookingPaidData),

    /// Booking was cancelled while on hold.
    BookingCancelled(BookingCancelledData),

    /// The hold lapsed and the sweeper reclaimed the booking.
    BookingExpired(BookingExpiredData),

    /// A paid booking was refunded.
    BookingRefunded(BookingRefundedData),
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingCreated(_) => "BookingCreated",
            BookingEvent::CombosReplaced(_) => "CombosReplaced",
            BookingEvent::PointsRedeemed(_) => "PointsRedeemed",
            BookingEvent::BookingPaid(_) => "BookingPaid",
            BookingEvent::BookingCancelled(_) => "BookingCancelled",
            BookingEvent::BookingExpired(_) => "BookingExpired",
            BookingEvent::BookingRefunded(_) => "BookingRefunded",
        }
    }
}

/// Data for BookingCreated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedData {
    pub booking_id: AggregateId,
    pub screening: ScreeningRef,
    /// None for guest bookings.
    pub customer: Option<CustomerId>,
    pub seats: Vec<BookedSeat>,
    pub seat_subtotal: Money,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Data for CombosReplaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombosReplacedData {
    pub lines: Vec<ComboLine>,
    pub combo_subtotal: Money,
    pub replaced_at: DateTime<Utc>,
}

/// Data for PointsRedeemed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsRedeemedData {
    pub points: i64,
    pub discount: Money,
    pub redeemed_at: DateTime<Utc>,
}

/// Data for BookingPaid.
///
/// Carries the full settlement snapshot so ledgers and notifications never
/// have to re-derive totals from downstream state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPaidData {
    pub payment_id: Uuid,
    pub paid_at: DateTime<Utc>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub combo_subtotal: Money,
    pub tickets: Vec<IssuedTicket>,
    pub screening_id: ScreeningId,
    pub cinema_id: CinemaId,
    pub movie_id: MovieId,
    pub customer: Option<CustomerId>,
}

/// Data for BookingCancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelledData {
    pub cancelled_at: DateTime<Utc>,
}

/// Data for BookingExpired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingExpiredData {
    pub expired_at: DateTime<Utc>,
}

/// Data for BookingRefunded.
///
/// Mirrors the paid snapshot with the reversal bookkeeping: the ledgers
/// negate these amounts, tickets are expired and points clawed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRefundedData {
    pub refunded_at: DateTime<Utc>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub combo_subtotal: Money,
    pub ticket_ids: Vec<Uuid>,
    pub screening_id: ScreeningId,
    pub cinema_id: CinemaId,
    pub movie_id: MovieId,
    pub customer: Option<CustomerId>,
    /// Points credited at settlement, now to be subtracted.
    pub points_reversed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::SeatType;

    fn screening_ref() -> ScreeningRef {
        ScreeningRef {
            screening_id: ScreeningId::new(),
            cinema_id: CinemaId::new(),
            movie_id: MovieId::new(),
            starts_at: Utc::now(),
            ends_at: Utc::now(),
        }
    }

    #[test]
    fn event_type_names() {
        let created = BookingEvent::BookingCreated(BookingCreatedData {
            booking_id: AggregateId::new(),
            screening: screening_ref(),
            customer: None,
            seats: vec![],
            seat_subtotal: Money::zero(),
            expires_at: Utc::now(),
            created_at: Utc::now(),
        });
        assert_eq!(created.event_type(), "BookingCreated");

        let cancelled = BookingEvent::BookingCancelled(BookingCancelledData {
            cancelled_at: Utc::now(),
        });
        assert_eq!(cancelled.event_type(), "BookingCancelled");
    }

    #[test]
    fn created_event_roundtrips_through_serde() {
        let booking_id = AggregateId::new();
        let customer = CustomerId::new();
        let event = BookingEvent::BookingCreated(BookingCreatedData {
            booking_id,
            screening: screening_ref(),
            customer: Some(customer),
            seats: vec![BookedSeat {
                seat_id: "A5".into(),
                row: "A".to_string(),
                number: 5,
                seat_type: SeatType::Standard,
                price: Money::from_minor(90_000),
            }],
            seat_subtotal: Money::from_minor(90_000),
            expires_at: Utc::now(),
            created_at: Utc::now(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BookingCreated"));

        let deserialized: BookingEvent = serde_json::from_str(&json).unwrap();
        if let BookingEvent::BookingCreated(data) = deserialized {
            assert_eq!(data.booking_id, booking_id);
            assert_eq!(data.customer, Some(customer));
            assert_eq!(data.seats.len(), 1);
        } else {
            panic!("Expected BookingCreated event");
        }
    }
}
