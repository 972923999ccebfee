//! Booking aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;

use super::{
    BookingError, BookingState,
    events::{
        BookingCancelledData, BookingCreatedData, BookingEvent, BookingExpiredData,
        BookingPaidData, BookingRefundedData, CombosReplacedData, PointsRedeemedData,
    },
    value_objects::{
        BookedSeat, ComboLine, IssuedTicket, Money, POINT_VALUE_MINOR, ScreeningRef,
        loyalty_points_earned,
    },
};

/// Maximum seats per booking.
const MAX_SEATS: usize = 8;

/// Booking aggregate root.
///
/// Owns the reservation lifecycle from hold to settlement and the money
/// invariant: `total = seat subtotal + combo subtotal - discount`, with the
/// discount capped at half of the pre-discount total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Booking {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    customer: Option<CustomerId>,

    screening: Option<ScreeningRef>,

    state: BookingState,

    seats: Vec<BookedSeat>,

    combos: Vec<ComboLine>,

    seat_subtotal: Money,

    combo_subtotal: Money,

    discount: Money,

    points_redeemed: i64,

    created_at: Option<DateTime<Utc>>,

    /// Absolute hold deadline, fixed at creation; nothing extends it.
    expires_at: Option<DateTime<Utc>>,

    tickets: Vec<IssuedTicket>,
}

impl Aggregate for Booking {
    type Event = BookingEvent;
    type Error = BookingError;

    fn aggregate_type() -> &'static str {
        "Booking"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            BookingEvent::BookingCreated(data) => self.apply_created(data),
            BookingEvent::CombosReplaced(data) => self.apply_combos_replaced(data),
            BookingEvent::PointsRedeemed(data) => self.apply_points_redeemed(data),
            BookingEvent::BookingPaid(data) => self.apply_paid(data),
            BookingEvent::BookingCancelled(_) => {
                self.state = BookingState::Cancelled;
            }
            BookingEvent::BookingExpired(_) => {
                self.state = BookingState::Expired;
            }
            BookingEvent::BookingRefunded(_) => {
                self.state = BookingState::Refunded;
            }
        }
    }
}

// Query methods
impl Booking {
    /// Returns the customer, if this is not a guest booking.
    pub fn customer(&self) -> Option<CustomerId> {
        self.customer
    }

    /// Returns the screening context captured at hold time.
    pub fn screening(&self) -> Option<&ScreeningRef> {
        self.screening.as_ref()
    }

    /// Returns the current state.
    pub fn state(&self) -> BookingState {
        self.state
    }

    /// Returns the held/sold seats.
    pub fn seats(&self) -> &[BookedSeat] {
        &self.seats
    }

    /// Returns the combo line items.
    pub fn combos(&self) -> &[ComboLine] {
        &self.combos
    }

    /// Returns the pre-discount total (seats plus combos).
    pub fn subtotal(&self) -> Money {
        self.seat_subtotal + self.combo_subtotal
    }

    /// Returns the combo portion of the subtotal.
    pub fn combo_subtotal(&self) -> Money {
        self.combo_subtotal
    }

    /// Returns the current discount.
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Returns the amount due: `subtotal - discount`.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount
    }

    /// Returns the loyalty points currently redeemed.
    pub fn points_redeemed(&self) -> i64 {
        self.points_redeemed
    }

    /// Returns the hold deadline.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true once the hold deadline has passed.
    pub fn hold_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }

    /// Returns the issued tickets (non-empty only after payment).
    pub fn tickets(&self) -> &[IssuedTicket] {
        &self.tickets
    }

    /// Returns true if the booking is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

// Command methods (return events)
impl Booking {
    /// Creates a booking in Hold state over an already-claimed seat set.
    pub fn create(
        &self,
        booking_id: AggregateId,
        screening: ScreeningRef,
        customer: Option<CustomerId>,
        seats: Vec<BookedSeat>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if self.id.is_some() {
            return Err(BookingError::AlreadyCreated);
        }

        if seats.is_empty() || seats.len() > MAX_SEATS {
            return Err(BookingError::InvalidSeatCount { count: seats.len() });
        }

        for (i, seat) in seats.iter().enumerate() {
            if seats[..i].iter().any(|s| s.seat_id == seat.seat_id) {
                return Err(BookingError::DuplicateSeat {
                    seat_id: seat.seat_id.clone(),
                });
            }
        }

        let seat_subtotal = seats
            .iter()
            .fold(Money::zero(), |acc, seat| acc + seat.price);

        Ok(vec![BookingEvent::BookingCreated(BookingCreatedData {
            booking_id,
            screening,
            customer,
            seats,
            seat_subtotal,
            expires_at,
            created_at: now,
        })])
    }

    /// Replaces all combo line items and recomputes totals.
    ///
    /// Legal only while on hold and before the deadline. An existing
    /// discount must stay within the 50% cap against the new subtotal.
    pub fn set_combos(
        &self,
        lines: Vec<ComboLine>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.state.can_modify() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "update combos",
            });
        }
        if self.hold_lapsed(now) {
            return Err(BookingError::HoldLapsed);
        }

        let combo_subtotal = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.subtotal());

        let new_subtotal = self.seat_subtotal + combo_subtotal;
        if self.discount.minor() * 2 > new_subtotal.minor() {
            return Err(BookingError::DiscountExceedsCap {
                discount: self.discount,
                subtotal: new_subtotal,
            });
        }

        Ok(vec![BookingEvent::CombosReplaced(CombosReplacedData {
            lines,
            combo_subtotal,
            replaced_at: now,
        })])
    }

    /// Redeems loyalty points into a discount, replacing any prior
    /// redemption.
    ///
    /// `balance` is the customer's current point balance as reported by the
    /// loyalty service.
    pub fn redeem_points(
        &self,
        points: i64,
        balance: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.state.can_modify() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "redeem points",
            });
        }
        if self.hold_lapsed(now) {
            return Err(BookingError::HoldLapsed);
        }
        if self.customer.is_none() {
            return Err(BookingError::GuestCannotRedeem);
        }
        if balance < points {
            return Err(BookingError::InsufficientPoints {
                requested: points,
                balance,
            });
        }

        let discount = Money::from_minor(points * POINT_VALUE_MINOR);
        if discount.minor() * 2 > self.subtotal().minor() {
            return Err(BookingError::DiscountExceedsCap {
                discount,
                subtotal: self.subtotal(),
            });
        }

        Ok(vec![BookingEvent::PointsRedeemed(PointsRedeemedData {
            points,
            discount,
            redeemed_at: now,
        })])
    }

    /// Confirms payment: the booking becomes Paid and tickets are issued.
    ///
    /// Invoked by the settlement path only, after the gateway reported
    /// success. A lapsed hold yields the distinct `HoldLapsed` signal so
    /// the caller can tell "expired" from a generic conflict.
    pub fn confirm_payment(
        &self,
        payment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.state.can_pay() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "confirm payment",
            });
        }
        if self.hold_lapsed(now) {
            return Err(BookingError::HoldLapsed);
        }

        let screening = self.screening.as_ref().ok_or(BookingError::InvalidStateTransition {
            current_state: self.state,
            action: "confirm payment",
        })?;

        let tickets: Vec<IssuedTicket> = self
            .seats
            .iter()
            .map(|seat| IssuedTicket::issue(seat.seat_id.clone(), screening.ends_at))
            .collect();

        Ok(vec![BookingEvent::BookingPaid(BookingPaidData {
            payment_id,
            paid_at: now,
            subtotal: self.subtotal(),
            discount: self.discount,
            total: self.total(),
            combo_subtotal: self.combo_subtotal,
            tickets,
            screening_id: screening.screening_id,
            cinema_id: screening.cinema_id,
            movie_id: screening.movie_id,
            customer: self.customer,
        })])
    }

    /// Cancels a held booking.
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.state.can_cancel() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "cancel",
            });
        }

        Ok(vec![BookingEvent::BookingCancelled(BookingCancelledData {
            cancelled_at: now,
        })])
    }

    /// Expires a lapsed hold.
    ///
    /// The sweeper re-validates both conditions against freshly loaded
    /// state; racing pay/cancel paths surface as state-transition errors
    /// the sweeper treats as no-ops.
    pub fn expire(&self, now: DateTime<Utc>) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.state.can_expire() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "expire",
            });
        }
        if !self.hold_lapsed(now) {
            return Err(BookingError::HoldStillActive);
        }

        Ok(vec![BookingEvent::BookingExpired(BookingExpiredData {
            expired_at: now,
        })])
    }

    /// Refunds a paid booking, producing the reversal snapshot.
    pub fn refund(&self, now: DateTime<Utc>) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.state.can_refund() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "refund",
            });
        }

        let screening = self.screening.as_ref().ok_or(BookingError::InvalidStateTransition {
            current_state: self.state,
            action: "refund",
        })?;

        Ok(vec![BookingEvent::BookingRefunded(BookingRefundedData {
            refunded_at: now,
            subtotal: self.subtotal(),
            discount: self.discount,
            total: self.total(),
            combo_subtotal: self.combo_subtotal,
            ticket_ids: self.tickets.iter().map(|t| t.ticket_id).collect(),
            screening_id: screening.screening_id,
            cinema_id: screening.cinema_id,
            movie_id: screening.movie_id,
            customer: self.customer,
            points_reversed: loyalty_points_earned(self.total(), self.discount),
        })])
    }
}

// Apply event helpers
impl Booking {
    fn apply_created(&mut self, data: BookingCreatedData) {
        self.id = Some(data.booking_id);
        self.screening = Some(data.screening);
        self.customer = data.customer;
        self.seats = data.seats;
        self.seat_subtotal = data.seat_subtotal;
        self.created_at = Some(data.created_at);
        self.expires_at = Some(data.expires_at);
        self.state = BookingState::Hold;
    }

    fn apply_combos_replaced(&mut self, data: CombosReplacedData) {
        self.combos = data.lines;
        self.combo_subtotal = data.combo_subtotal;
    }

    fn apply_points_redeemed(&mut self, data: PointsRedeemedData) {
        self.points_redeemed = data.points;
        self.discount = data.discount;
    }

    fn apply_paid(&mut self, data: BookingPaidData) {
        self.state = BookingState::Paid;
        self.tickets = data.tickets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::SeatType;
    use chrono::Duration;
    use common::{CinemaId, MovieId, ScreeningId};

    fn screening_ref(now: DateTime<Utc>) -> ScreeningRef {
        ScreeningRef {
            screening_id: ScreeningId::new(),
            cinema_id: CinemaId::new(),
            movie_id: MovieId::new(),
            starts_at: now + Duration::hours(2),
            ends_at: now + Duration::hours(4),
        }
    }

    fn booked_seat(id: &str, number: u32, price: i64) -> BookedSeat {
        BookedSeat {
            seat_id: id.into(),
            row: "A".to_string(),
            number,
            seat_type: SeatType::Standard,
            price: Money::from_minor(price),
        }
    }

    fn held_booking(customer: Option<CustomerId>) -> (Booking, AggregateId, DateTime<Utc>) {
        let now = Utc::now();
        let mut booking = Booking::default();
        let booking_id = AggregateId::new();
        let events = booking
            .create(
                booking_id,
                screening_ref(now),
                customer,
                vec![
                    booked_seat("A4", 4, 90_000),
                    booked_seat("A5", 5, 90_000),
                ],
                now + Duration::minutes(10),
                now,
            )
            .unwrap();
        booking.apply_events(events);
        (booking, booking_id, now)
    }

    #[test]
    fn create_holds_with_totals() {
        let (booking, booking_id, _) = held_booking(None);
        assert_eq!(booking.id(), Some(booking_id));
        assert_eq!(booking.state(), BookingState::Hold);
        assert_eq!(booking.subtotal().minor(), 180_000);
        assert_eq!(booking.total().minor(), 180_000);
        assert!(booking.customer().is_none());
    }

    #[test]
    fn create_twice_fails() {
        let (booking, _, now) = held_booking(None);
        let result = booking.create(
            AggregateId::new(),
            screening_ref(now),
            None,
            vec![booked_seat("A1", 1, 90_000)],
            now + Duration::minutes(10),
            now,
        );
        assert!(matches!(result, Err(BookingError::AlreadyCreated)));
    }

    #[test]
    fn create_rejects_bad_seat_counts() {
        let now = Utc::now();
        let booking = Booking::default();

        let result = booking.create(
            AggregateId::new(),
            screening_ref(now),
            None,
            vec![],
            now + Duration::minutes(10),
            now,
        );
        assert!(matches!(
            result,
            Err(BookingError::InvalidSeatCount { count: 0 })
        ));

        let nine: Vec<BookedSeat> = (1..=9)
            .map(|n| booked_seat(&format!("A{n}"), n, 90_000))
            .collect();
        let result = booking.create(
            AggregateId::new(),
            screening_ref(now),
            None,
            nine,
            now + Duration::minutes(10),
            now,
        );
        assert!(matches!(
            result,
            Err(BookingError::InvalidSeatCount { count: 9 })
        ));
    }

    #[test]
    fn create_rejects_duplicate_seats() {
        let now = Utc::now();
        let booking = Booking::default();
        let result = booking.create(
            AggregateId::new(),
            screening_ref(now),
            None,
            vec![booked_seat("A4", 4, 90_000), booked_seat("A4", 4, 90_000)],
            now + Duration::minutes(10),
            now,
        );
        assert!(matches!(result, Err(BookingError::DuplicateSeat { .. })));
    }

    #[test]
    fn set_combos_recomputes_totals() {
        let (mut booking, _, now) = held_booking(None);
        let lines = vec![ComboLine::new(
            "CB1",
            "Popcorn + Cola",
            2,
            Money::from_minor(45_000),
        )];

        let events = booking.set_combos(lines, now).unwrap();
        booking.apply_events(events);

        assert_eq!(booking.combo_subtotal().minor(), 90_000);
        assert_eq!(booking.subtotal().minor(), 270_000);
        assert_eq!(booking.total().minor(), 270_000);

        // Wholesale replacement: a new set overwrites the old one.
        let events = booking.set_combos(vec![], now).unwrap();
        booking.apply_events(events);
        assert_eq!(booking.combo_subtotal().minor(), 0);
        assert_eq!(booking.subtotal().minor(), 180_000);
    }

    #[test]
    fn set_combos_after_lapse_fails() {
        let (booking, _, now) = held_booking(None);
        let late = now + Duration::minutes(11);
        let result = booking.set_combos(vec![], late);
        assert!(matches!(result, Err(BookingError::HoldLapsed)));
    }

    #[test]
    fn combo_shrink_cannot_break_discount_cap() {
        let customer = CustomerId::new();
        let (mut booking, _, now) = held_booking(Some(customer));

        // Combos raise the subtotal to 360,000; redeem points worth 150,000.
        let lines = vec![ComboLine::new(
            "CB1",
            "Family pack",
            4,
            Money::from_minor(45_000),
        )];
        booking.apply_events(booking.set_combos(lines, now).unwrap());
        booking.apply_events(
            booking
                .redeem_points(150, 500, now)
                .unwrap(),
        );

        // Dropping the combos would leave a 150,000 discount against a
        // 180,000 subtotal: over the 50% cap, so rejected.
        let result = booking.set_combos(vec![], now);
        assert!(matches!(
            result,
            Err(BookingError::DiscountExceedsCap { .. })
        ));
    }

    #[test]
    fn redeem_points_sets_discount() {
        let customer = CustomerId::new();
        let (mut booking, _, now) = held_booking(Some(customer));

        let events = booking
            .redeem_points(50, 100, now)
            .unwrap();
        booking.apply_events(events);

        assert_eq!(booking.discount().minor(), 50_000);
        assert_eq!(booking.total().minor(), 130_000);
        assert_eq!(booking.points_redeemed(), 50);
    }

    #[test]
    fn redeem_replaces_previous_redemption() {
        let customer = CustomerId::new();
        let (mut booking, _, now) = held_booking(Some(customer));

        booking.apply_events(
            booking
                .redeem_points(50, 100, now)
                .unwrap(),
        );
        booking.apply_events(
            booking
                .redeem_points(20, 100, now)
                .unwrap(),
        );

        assert_eq!(booking.discount().minor(), 20_000);
        assert_eq!(booking.points_redeemed(), 20);
    }

    #[test]
    fn redeem_over_half_of_subtotal_fails() {
        let customer = CustomerId::new();
        let (booking, _, now) = held_booking(Some(customer));

        // 91 points = 91,000 > 50% of 180,000.
        let result = booking.redeem_points(91, 500, now);
        assert!(matches!(
            result,
            Err(BookingError::DiscountExceedsCap { .. })
        ));
    }

    #[test]
    fn redeem_beyond_balance_fails() {
        let customer = CustomerId::new();
        let (booking, _, now) = held_booking(Some(customer));

        let result = booking.redeem_points(50, 10, now);
        assert!(matches!(
            result,
            Err(BookingError::InsufficientPoints { .. })
        ));
    }

    #[test]
    fn guest_cannot_redeem() {
        let (booking, _, now) = held_booking(None);
        let result = booking.redeem_points(10, 100, now);
        assert!(matches!(result, Err(BookingError::GuestCannotRedeem)));
    }

    #[test]
    fn confirm_payment_issues_one_ticket_per_seat() {
        let (mut booking, _, now) = held_booking(None);
        let payment_id = Uuid::new_v4();

        let events = booking.confirm_payment(payment_id, now).unwrap();
        if let BookingEvent::BookingPaid(data) = &events[0] {
            assert_eq!(data.tickets.len(), 2);
            assert_eq!(data.total.minor(), 180_000);
            assert_eq!(data.payment_id, payment_id);
        } else {
            panic!("Expected BookingPaid event");
        }
        booking.apply_events(events);

        assert_eq!(booking.state(), BookingState::Paid);
        assert_eq!(booking.tickets().len(), 2);
    }

    #[test]
    fn confirm_payment_after_lapse_reports_expired() {
        let (booking, _, now) = held_booking(None);
        let late = now + Duration::minutes(11);
        let result = booking.confirm_payment(Uuid::new_v4(), late);
        assert!(matches!(result, Err(BookingError::HoldLapsed)));
    }

    #[test]
    fn confirm_payment_twice_fails() {
        let (mut booking, _, now) = held_booking(None);
        booking.apply_events(booking.confirm_payment(Uuid::new_v4(), now).unwrap());

        let result = booking.confirm_payment(Uuid::new_v4(), now);
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn cancel_only_from_hold() {
        let (mut booking, _, now) = held_booking(None);
        booking.apply_events(booking.cancel(now).unwrap());
        assert_eq!(booking.state(), BookingState::Cancelled);

        let result = booking.cancel(now);
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn expire_requires_lapsed_hold() {
        let (mut booking, _, now) = held_booking(None);

        let result = booking.expire(now);
        assert!(matches!(result, Err(BookingError::HoldStillActive)));

        let late = now + Duration::minutes(11);
        booking.apply_events(booking.expire(late).unwrap());
        assert_eq!(booking.state(), BookingState::Expired);
    }

    #[test]
    fn expire_after_payment_is_a_state_conflict() {
        let (mut booking, _, now) = held_booking(None);
        booking.apply_events(booking.confirm_payment(Uuid::new_v4(), now).unwrap());

        let late = now + Duration::minutes(11);
        let result = booking.expire(late);
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn refund_reverses_points_and_lists_tickets() {
        let customer = CustomerId::new();
        let (mut booking, _, now) = held_booking(Some(customer));

        booking.apply_events(
            booking
                .redeem_points(50, 100, now)
                .unwrap(),
        );
        booking.apply_events(booking.confirm_payment(Uuid::new_v4(), now).unwrap());

        let events = booking.refund(now).unwrap();
        if let BookingEvent::BookingRefunded(data) = &events[0] {
            assert_eq!(data.ticket_ids.len(), 2);
            // total 130,000 / 20,000 = 6; discount 50,000 / 1,000 = 50.
            assert_eq!(data.points_reversed, 6 - 50);
            assert_eq!(data.total.minor(), 130_000);
        } else {
            panic!("Expected BookingRefunded event");
        }
        booking.apply_events(events);
        assert_eq!(booking.state(), BookingState::Refunded);
    }

    #[test]
    fn refund_only_from_paid() {
        let (booking, _, now) = held_booking(None);
        let result = booking.refund(now);
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn totals_invariant_holds_across_mutations() {
        let customer = CustomerId::new();
        let (mut booking, _, now) = held_booking(Some(customer));

        booking.apply_events(
            booking
                .set_combos(
                    vec![ComboLine::new("CB1", "Snack", 1, Money::from_minor(40_000))],
                    now,
                )
                .unwrap(),
        );
        booking.apply_events(
            booking
                .redeem_points(30, 100, now)
                .unwrap(),
        );

        assert_eq!(
            booking.total().minor(),
            booking.subtotal().minor() - booking.discount().minor()
        );
        assert!(booking.discount().minor() * 2 <= booking.subtotal().minor());
    }
}
