//! Seating domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, ScreeningId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::seat::{SeatId, SeatSpec};

/// Events that can occur on a screening's seat inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SeatingEvent {
    /// The seat inventory for a screening was opened from the catalog layout.
    SeatingOpened(SeatingOpenedData),

    /// A booking atomically claimed a set of seats.
    SeatsHeld(SeatsHeldData),

    /// A booking's seats were returned to the available pool.
    SeatsReleased(SeatsReleasedData),

    /// A booking's held seats were sold on payment confirmation.
    SeatsSold(SeatsSoldData),
}

impl DomainEvent for SeatingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SeatingEvent::SeatingOpened(_) => "SeatingOpened",
            SeatingEvent::SeatsHeld(_) => "SeatsHeld",
            SeatingEvent::SeatsReleased(_) => "SeatsReleased",
            SeatingEvent::SeatsSold(_) => "SeatsSold",
        }
    }
}

/// Data for SeatingOpened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatingOpenedData {
    pub screening_id: ScreeningId,
    pub seats: Vec<SeatSpec>,
    pub opened_at: DateTime<Utc>,
}

/// Data for SeatsHeld.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatsHeldData {
    pub booking_id: AggregateId,
    pub seat_ids: Vec<SeatId>,
    pub expires_at: DateTime<Utc>,
    pub held_at: DateTime<Utc>,
}

/// Data for SeatsReleased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatsReleasedData {
    pub booking_id: AggregateId,
    pub seat_ids: Vec<SeatId>,
    pub released_at: DateTime<Utc>,
}

/// Data for SeatsSold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatsSoldData {
    pub booking_id: AggregateId,
    pub seat_ids: Vec<SeatId>,
    pub sold_at: DateTime<Utc>,
}

impl SeatingEvent {
    /// Creates a SeatingOpened event.
    pub fn seating_opened(screening_id: ScreeningId, seats: Vec<SeatSpec>) -> Self {
        SeatingEvent::SeatingOpened(SeatingOpenedData {
            screening_id,
            seats,
            opened_at: Utc::now(),
        })
    }

    /// Creates a SeatsHeld event.
    pub fn seats_held(
        booking_id: AggregateId,
        seat_ids: Vec<SeatId>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        SeatingEvent::SeatsHeld(SeatsHeldData {
            booking_id,
            seat_ids,
            expires_at,
            held_at: Utc::now(),
        })
    }

    /// Creates a SeatsReleased event.
    pub fn seats_released(booking_id: AggregateId, seat_ids: Vec<SeatId>) -> Self {
        SeatingEvent::SeatsReleased(SeatsReleasedData {
            booking_id,
            seat_ids,
            released_at: Utc::now(),
        })
    }

    /// Creates a SeatsSold event.
    pub fn seats_sold(booking_id: AggregateId, seat_ids: Vec<SeatId>) -> Self {
        SeatingEvent::SeatsSold(SeatsSoldData {
            booking_id,
            seat_ids,
            sold_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::SeatType;

    #[test]
    fn event_type_names() {
        let screening = ScreeningId::new();
        let booking = AggregateId::new();

        let event = SeatingEvent::seating_opened(
            screening,
            vec![SeatSpec::new("A1", "A", 1, SeatType::Standard)],
        );
        assert_eq!(event.event_type(), "SeatingOpened");

        let event = SeatingEvent::seats_held(booking, vec!["A1".into()], Utc::now());
        assert_eq!(event.event_type(), "SeatsHeld");

        let event = SeatingEvent::seats_released(booking, vec!["A1".into()]);
        assert_eq!(event.event_type(), "SeatsReleased");

        let event = SeatingEvent::seats_sold(booking, vec!["A1".into()]);
        assert_eq!(event.event_type(), "SeatsSold");
    }

    #[test]
    fn seats_held_roundtrips_through_serde() {
        let booking = AggregateId::new();
        let event = SeatingEvent::seats_held(booking, vec!["A1".into(), "A2".into()], Utc::now());

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: SeatingEvent = serde_json::from_str(&json).unwrap();

        if let SeatingEvent::SeatsHeld(data) = deserialized {
            assert_eq!(data.booking_id, booking);
            assert_eq!(data.seat_ids.len(), 2);
        } else {
            panic!("Expected SeatsHeld event");
        }
    }
}
