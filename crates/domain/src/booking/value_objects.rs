//! Value objects for the booking domain.

use chrono::{DateTime, Utc};
use common::{CinemaId, MovieId, ScreeningId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seating::{SeatId, SeatType};

/// Value of one loyalty point in minor currency units.
pub const POINT_VALUE_MINOR: i64 = 1_000;

/// Money in minor currency units to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (e.g. 90_000 = 90,000 units).
    minor: i64,
}

impl Money {
    /// Creates a money amount from minor units.
    pub fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { minor: 0 }
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.minor < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            minor: self.minor * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.minor)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            minor: self.minor + rhs.minor,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            minor: self.minor - rhs.minor,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.minor += rhs.minor;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.minor -= rhs.minor;
    }
}

/// Loyalty points earned for a settled booking.
///
/// The deduction term claws back the points whose redemption produced the
/// discount. The same formula, negated, drives the refund reversal.
pub fn loyalty_points_earned(total: Money, discount: Money) -> i64 {
    total.minor() / 20_000 - discount.minor() / POINT_VALUE_MINOR
}

/// Catalog context of the screening a booking belongs to.
///
/// Captured at hold time so settlement and ledgers never need a catalog
/// round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRef {
    pub screening_id: ScreeningId,
    pub cinema_id: CinemaId,
    pub movie_id: MovieId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// A seat held by a booking, priced at hold time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSeat {
    pub seat_id: SeatId,
    pub row: String,
    pub number: u32,
    pub seat_type: SeatType,
    pub price: Money,
}

/// A concession combo line attached to a booking.
///
/// Lines are replaced wholesale on update; `remaining` counts redemptions
/// left at check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboLine {
    pub combo_id: String,
    pub name: String,
    pub quantity: u32,
    pub remaining: u32,
    pub unit_price: Money,
}

impl ComboLine {
    /// Creates a combo line with all redemptions remaining.
    pub fn new(
        combo_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            combo_id: combo_id.into(),
            name: name.into(),
            quantity,
            remaining: quantity,
            unit_price,
        }
    }

    /// Returns the line subtotal (quantity x unit price).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A ticket issued for one sold seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedTicket {
    pub ticket_id: Uuid,
    pub seat_id: SeatId,
    /// Scannable code presented at check-in.
    pub code: String,
    /// Tickets lapse at the screening's end time.
    pub expires_at: DateTime<Utc>,
}

impl IssuedTicket {
    /// Issues a fresh ticket for a seat.
    pub fn issue(seat_id: SeatId, expires_at: DateTime<Utc>) -> Self {
        let ticket_id = Uuid::new_v4();
        Self {
            ticket_id,
            seat_id,
            code: format!("TKT-{}", ticket_id.simple()),
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::from_minor(1_000);
        let b = Money::from_minor(400);

        assert_eq!((a + b).minor(), 1_400);
        assert_eq!((a - b).minor(), 600);
        assert_eq!(a.multiply(3).minor(), 3_000);
    }

    #[test]
    fn money_sign_checks() {
        assert!(Money::from_minor(1).is_positive());
        assert!(Money::zero().is_zero());
        assert!(Money::from_minor(-1).is_negative());
    }

    #[test]
    fn money_assign_ops() {
        let mut money = Money::from_minor(100);
        money += Money::from_minor(50);
        assert_eq!(money.minor(), 150);
        money -= Money::from_minor(30);
        assert_eq!(money.minor(), 120);
    }

    #[test]
    fn points_earned_formula() {
        // 180,000 total, no discount: 9 points.
        assert_eq!(
            loyalty_points_earned(Money::from_minor(180_000), Money::zero()),
            9
        );
        // 170,000 total after a 10,000 discount: 8 - 10 = -2.
        assert_eq!(
            loyalty_points_earned(Money::from_minor(170_000), Money::from_minor(10_000)),
            -2
        );
    }

    #[test]
    fn combo_line_subtotal() {
        let line = ComboLine::new("CB1", "Popcorn + Cola", 3, Money::from_minor(45_000));
        assert_eq!(line.subtotal().minor(), 135_000);
        assert_eq!(line.remaining, 3);
    }

    #[test]
    fn issued_ticket_carries_code_and_expiry() {
        let expires = Utc::now();
        let ticket = IssuedTicket::issue("A5".into(), expires);
        assert!(ticket.code.starts_with("TKT-"));
        assert_eq!(ticket.expires_at, expires);

        let other = IssuedTicket::issue("A6".into(), expires);
        assert_ne!(ticket.ticket_id, other.ticket_id);
        assert_ne!(ticket.code, other.code);
    }

    #[test]
    fn booked_seat_serialization() {
        let seat = BookedSeat {
            seat_id: "A5".into(),
            row: "A".to_string(),
            number: 5,
            seat_type: SeatType::Vip,
            price: Money::from_minor(120_000),
        };
        let json = serde_json::to_string(&seat).unwrap();
        let deserialized: BookedSeat = serde_json::from_str(&json).unwrap();
        assert_eq!(seat, deserialized);
    }
}
