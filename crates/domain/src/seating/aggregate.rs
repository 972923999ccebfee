//! ScreeningSeating aggregate implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{AggregateId, ScreeningId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    SeatingError,
    events::{SeatingEvent, SeatingOpenedData, SeatsHeldData, SeatsReleasedData, SeatsSoldData},
    orphan::{RowOccupancy, Slot, validate_selection},
    seat::{ScreeningSeat, SeatId, SeatSpec, SeatStatus},
};

/// Seat inventory for one screening.
///
/// Every hold, release and sale of this screening's seats is an event on
/// this aggregate, so any two racing mutations contend on one version
/// counter: the fundamental all-or-nothing guarantee for multi-seat holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreeningSeating {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    screening_id: Option<ScreeningId>,

    /// Seats keyed by ID, ordered for stable row traversal.
    seats: BTreeMap<SeatId, ScreeningSeat>,
}

impl Aggregate for ScreeningSeating {
    type Event = SeatingEvent;
    type Error = SeatingError;

    fn aggregate_type() -> &'static str {
        "ScreeningSeating"
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
            SeatingEvent::SeatingOpened(data) => self.apply_opened(data),
            SeatingEvent::SeatsHeld(data) => self.apply_held(data),
            SeatingEvent::SeatsReleased(data) => self.apply_released(data),
            SeatingEvent::SeatsSold(data) => self.apply_sold(data),
        }
    }
}

// Query methods
impl ScreeningSeating {
    /// Returns the screening this inventory belongs to.
    pub fn screening_id(&self) -> Option<ScreeningId> {
        self.screening_id
    }

    /// Returns all seats.
    pub fn seats(&self) -> impl Iterator<Item = &ScreeningSeat> {
        self.seats.values()
    }

    /// Returns a seat by ID.
    pub fn seat(&self, seat_id: &SeatId) -> Option<&ScreeningSeat> {
        self.seats.get(seat_id)
    }

    /// Returns the seats currently attributed to a booking.
    pub fn seats_of_booking(&self, booking_id: AggregateId) -> Vec<&ScreeningSeat> {
        self.seats
            .values()
            .filter(|s| s.booking == Some(booking_id))
            .collect()
    }

    /// Returns the number of available seats.
    pub fn available_count(&self) -> usize {
        self.seats
            .values()
            .filter(|s| s.status == SeatStatus::Available)
            .count()
    }

    /// Builds the per-row occupancy map for a prospective selection.
    ///
    /// Only the rows touched by the selection are materialized. Seat
    /// numbers missing from a row's layout count as occupied, matching the
    /// boundary rule of the orphan check.
    fn occupancy_for(&self, selection: &[SeatId]) -> Vec<RowOccupancy> {
        let mut rows: Vec<String> = self
            .seats
            .values()
            .filter(|s| selection.contains(&s.seat_id))
            .map(|s| s.row.clone())
            .collect();
        rows.sort();
        rows.dedup();

        rows.into_iter()
            .map(|row| {
                let row_seats: Vec<&ScreeningSeat> = self
                    .seats
                    .values()
                    .filter(|s| s.row == row)
                    .collect();
                let len = row_seats.iter().map(|s| s.number).max().unwrap_or(0) as usize;

                let mut slots = vec![Slot::Occupied; len];
                for seat in row_seats {
                    let idx = (seat.number - 1) as usize;
                    slots[idx] = if selection.contains(&seat.seat_id) {
                        Slot::Selected
                    } else if seat.status == SeatStatus::Available {
                        Slot::Available
                    } else {
                        Slot::Occupied
                    };
                }

                RowOccupancy::new(row, slots)
            })
            .collect()
    }
}

// Command methods (return events)
impl ScreeningSeating {
    /// Opens the seat inventory from the catalog layout.
    pub fn open(
        &self,
        screening_id: ScreeningId,
        layout: Vec<SeatSpec>,
    ) -> Result<Vec<SeatingEvent>, SeatingError> {
        if self.id.is_some() {
            return Err(SeatingError::AlreadyOpen);
        }
        if layout.is_empty() {
            return Err(SeatingError::EmptyLayout);
        }

        Ok(vec![SeatingEvent::seating_opened(screening_id, layout)])
    }

    /// Atomically claims a set of seats for a booking.
    ///
    /// All requested seats must exist and be available, and the resulting
    /// layout must pass the orphan check. Committing the returned event
    /// under the expected-version append makes this the compare-and-swap
    /// that spec'd conditional updates provide elsewhere: a racing hold on
    /// an overlapping set either conflicts at append time or observes the
    /// seats as held on reload.
    pub fn hold(
        &self,
        booking_id: AggregateId,
        seat_ids: &[SeatId],
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<SeatingEvent>, SeatingError> {
        if self.id.is_none() {
            return Err(SeatingError::NotOpen);
        }

        let mut requested: Vec<SeatId> = seat_ids.to_vec();
        requested.sort();
        requested.dedup();

        for seat_id in &requested {
            if !self.seats.contains_key(seat_id) {
                return Err(SeatingError::UnknownSeat {
                    seat_id: seat_id.clone(),
                });
            }
        }

        let unavailable: Vec<SeatId> = requested
            .iter()
            .filter(|id| {
                self.seats
                    .get(*id)
                    .map(|s| s.status != SeatStatus::Available)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        if !unavailable.is_empty() {
            metrics::counter!("seat_hold_rejections_total", "reason" => "unavailable")
                .increment(1);
            return Err(SeatingError::SeatsUnavailable { seats: unavailable });
        }

        validate_selection(&self.occupancy_for(&requested)).map_err(|violation| {
            metrics::counter!("seat_hold_rejections_total", "reason" => "orphan").increment(1);
            SeatingError::Orphan(violation)
        })?;

        Ok(vec![SeatingEvent::seats_held(
            booking_id, requested, expires_at,
        )])
    }

    /// Releases all seats attributed to a booking back to available.
    ///
    /// Covers cancel, expiry and refund. Releasing a booking that holds
    /// nothing is a no-op so that racing release paths stay idempotent.
    pub fn release(&self, booking_id: AggregateId) -> Result<Vec<SeatingEvent>, SeatingError> {
        if self.id.is_none() {
            return Err(SeatingError::NotOpen);
        }

        let seat_ids: Vec<SeatId> = self
            .seats
            .values()
            .filter(|s| s.booking == Some(booking_id))
            .map(|s| s.seat_id.clone())
            .collect();

        if seat_ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![SeatingEvent::seats_released(booking_id, seat_ids)])
    }

    /// Marks a booking's held seats as sold.
    ///
    /// Already-sold seats are a no-op so settlement retries stay quiet.
    pub fn sell(&self, booking_id: AggregateId) -> Result<Vec<SeatingEvent>, SeatingError> {
        if self.id.is_none() {
            return Err(SeatingError::NotOpen);
        }

        let owned: Vec<&ScreeningSeat> = self.seats_of_booking(booking_id);
        if owned.is_empty() {
            return Err(SeatingError::NothingHeld { booking_id });
        }

        let held: Vec<SeatId> = owned
            .iter()
            .filter(|s| s.status == SeatStatus::Held)
            .map(|s| s.seat_id.clone())
            .collect();

        if held.is_empty() {
            // Everything this booking owns is already sold.
            return Ok(vec![]);
        }

        Ok(vec![SeatingEvent::seats_sold(booking_id, held)])
    }
}

// Apply event helpers
impl ScreeningSeating {
    fn apply_opened(&mut self, data: SeatingOpenedData) {
        self.id = Some(data.screening_id.seating_aggregate());
        self.screening_id = Some(data.screening_id);
        self.seats = data
            .seats
            .into_iter()
            .map(|spec| (spec.seat_id.clone(), ScreeningSeat::from_spec(spec)))
            .collect();
    }

    fn apply_held(&mut self, data: SeatsHeldData) {
        for seat_id in &data.seat_ids {
            if let Some(seat) = self.seats.get_mut(seat_id) {
                seat.status = SeatStatus::Held;
                seat.booking = Some(data.booking_id);
                seat.hold_expires_at = Some(data.expires_at);
            }
        }
    }

    fn apply_released(&mut self, data: SeatsReleasedData) {
        for seat_id in &data.seat_ids {
            if let Some(seat) = self.seats.get_mut(seat_id)
                && seat.booking == Some(data.booking_id)
            {
                seat.status = SeatStatus::Available;
                seat.booking = None;
                seat.hold_expires_at = None;
            }
        }
    }

    fn apply_sold(&mut self, data: SeatsSoldData) {
        for seat_id in &data.seat_ids {
            if let Some(seat) = self.seats.get_mut(seat_id)
                && seat.booking == Some(data.booking_id)
            {
                seat.status = SeatStatus::Sold;
                seat.hold_expires_at = None;
            }
        }
    }
}
