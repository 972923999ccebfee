//! Read-only boundary to the catalog service.
//!
//! Screenings, seat layouts, price rules and concession combos live in the
//! catalog; this engine only reads them. The in-memory implementation backs
//! tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use common::{CinemaId, MovieId, ScreeningId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::Money;
use crate::seating::{SeatSpec, SeatType};

/// Errors from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The screening does not exist.
    #[error("Screening not found: {0}")]
    ScreeningNotFound(ScreeningId),

    /// The screening's movie has been archived and cannot be booked.
    #[error("Movie is archived for screening {0}")]
    MovieArchived(ScreeningId),

    /// The concession combo does not exist.
    #[error("Combo not found: {0}")]
    ComboNotFound(String),
}

/// The slot of day a screening starts in, for price-rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    /// Derives the slot from a screening start time.
    pub fn from_start(starts_at: DateTime<Utc>) -> Self {
        match starts_at.hour() {
            0..=11 => TimeSlot::Morning,
            12..=16 => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }
}

/// Weekday/weekend split for price-rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// Derives the day type from a screening start time.
    pub fn from_start(starts_at: DateTime<Utc>) -> Self {
        match starts_at.weekday() {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}

/// A specific price for a (seat type, time slot, day type) combination.
///
/// When no rule matches, the seat type's base price applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRule {
    pub seat_type: SeatType,
    pub time_slot: TimeSlot,
    pub day_type: DayType,
    pub price: Money,
}

/// Screening data as provided by the catalog.
#[derive(Debug, Clone)]
pub struct ScreeningInfo {
    pub screening_id: ScreeningId,
    pub cinema_id: CinemaId,
    pub movie_id: MovieId,
    pub room_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub movie_archived: bool,
    pub seats: Vec<SeatSpec>,
}

impl ScreeningInfo {
    /// Returns the layout spec for a seat, if it belongs to this screening.
    pub fn seat(&self, seat_id: &crate::seating::SeatId) -> Option<&SeatSpec> {
        self.seats.iter().find(|s| &s.seat_id == seat_id)
    }
}

/// A concession combo as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboInfo {
    pub combo_id: String,
    pub name: String,
    pub unit_price: Money,
}

/// Read-only catalog boundary.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a screening with its seat layout.
    async fn screening(&self, id: ScreeningId) -> Result<ScreeningInfo, CatalogError>;

    /// Resolves the price of a seat type for a screening start time:
    /// a matching price rule wins, otherwise the seat type's base price.
    async fn seat_price(&self, seat_type: SeatType, starts_at: DateTime<Utc>) -> Money;

    /// Looks up a concession combo.
    async fn combo(&self, combo_id: &str) -> Result<ComboInfo, CatalogError>;
}

#[derive(Default)]
struct CatalogState {
    screenings: HashMap<ScreeningId, ScreeningInfo>,
    base_prices: HashMap<SeatType, Money>,
    rules: Vec<PriceRule>,
    combos: HashMap<String, ComboInfo>,
}

/// In-memory catalog for tests and local development.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a screening.
    pub fn add_screening(&self, info: ScreeningInfo) {
        self.state
            .write()
            .unwrap()
            .screenings
            .insert(info.screening_id, info);
    }

    /// Sets the base price for a seat type.
    pub fn set_base_price(&self, seat_type: SeatType, price: Money) {
        self.state
            .write()
            .unwrap()
            .base_prices
            .insert(seat_type, price);
    }

    /// Adds a specific price rule.
    pub fn add_rule(&self, rule: PriceRule) {
        self.state.write().unwrap().rules.push(rule);
    }

    /// Registers a concession combo.
    pub fn add_combo(&self, combo: ComboInfo) {
        self.state
            .write()
            .unwrap()
            .combos
            .insert(combo.combo_id.clone(), combo);
    }

    /// Marks a screening's movie as archived.
    pub fn archive_movie(&self, screening_id: ScreeningId) {
        if let Some(info) = self
            .state
            .write()
            .unwrap()
            .screenings
            .get_mut(&screening_id)
        {
            info.movie_archived = true;
        }
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn screening(&self, id: ScreeningId) -> Result<ScreeningInfo, CatalogError> {
        self.state
            .read()
            .unwrap()
            .screenings
            .get(&id)
            .cloned()
            .ok_or(CatalogError::ScreeningNotFound(id))
    }

    async fn seat_price(&self, seat_type: SeatType, starts_at: DateTime<Utc>) -> Money {
        let slot = TimeSlot::from_start(starts_at);
        let day = DayType::from_start(starts_at);

        let state = self.state.read().unwrap();
        state
            .rules
            .iter()
            .find(|r| r.seat_type == seat_type && r.time_slot == slot && r.day_type == day)
            .map(|r| r.price)
            .or_else(|| state.base_prices.get(&seat_type).copied())
            .unwrap_or_else(Money::zero)
    }

    async fn combo(&self, combo_id: &str) -> Result<ComboInfo, CatalogError> {
        self.state
            .read()
            .unwrap()
            .combos
            .get(combo_id)
            .cloned()
            .ok_or_else(|| CatalogError::ComboNotFound(combo_id.to_string()))
    }
}
