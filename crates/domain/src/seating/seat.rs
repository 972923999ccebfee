//! Seat identity, layout and per-screening status.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

/// Seat identifier within a room, e.g. "C07".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    /// Creates a seat ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the seat ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SeatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SeatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SeatId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Seat category, priced via the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatType {
    Standard,
    Vip,
    Couple,
}

impl SeatType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Standard => "Standard",
            SeatType::Vip => "Vip",
            SeatType::Couple => "Couple",
        }
    }
}

impl std::fmt::Display for SeatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-screening seat status.
///
/// `Sold` is monotonic: the only way back to `Available` is the single
/// refund release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SeatStatus {
    #[default]
    Available,
    Held,
    Sold,
}

impl SeatStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "Available",
            SeatStatus::Held => "Held",
            SeatStatus::Sold => "Sold",
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical seat position as laid out by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    pub seat_id: SeatId,
    pub row: String,
    pub number: u32,
    pub seat_type: SeatType,
}

impl SeatSpec {
    /// Creates a seat spec.
    pub fn new(
        seat_id: impl Into<SeatId>,
        row: impl Into<String>,
        number: u32,
        seat_type: SeatType,
    ) -> Self {
        Self {
            seat_id: seat_id.into(),
            row: row.into(),
            number,
            seat_type,
        }
    }
}

/// A seat paired with its status for one screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningSeat {
    pub seat_id: SeatId,
    pub row: String,
    pub number: u32,
    pub seat_type: SeatType,
    pub status: SeatStatus,
    /// The booking currently holding or owning this seat.
    pub booking: Option<AggregateId>,
    /// When the current hold lapses; None unless status is Held.
    pub hold_expires_at: Option<DateTime<Utc>>,
}

impl ScreeningSeat {
    /// Creates an available seat from its layout spec.
    pub fn from_spec(spec: SeatSpec) -> Self {
        Self {
            seat_id: spec.seat_id,
            row: spec.row,
            number: spec.number,
            seat_type: spec.seat_type,
            status: SeatStatus::Available,
            booking: None,
            hold_expires_at: None,
        }
    }
}
