//! Index of live holds, feeding the expiration sweeper.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, ScreeningId};
use domain::BookingEvent;
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One booking currently on hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldEntry {
    pub booking_id: AggregateId,
    pub screening_id: ScreeningId,
    pub expires_at: DateTime<Utc>,
}

struct ActiveHoldsState {
    holds: HashMap<AggregateId, HoldEntry>,
    position: ProjectionPosition,
}

/// Read model indexing bookings still in Hold with their deadlines.
///
/// The sweeper scans this instead of every booking aggregate. Entries leave
/// the index on any transition out of Hold; the sweeper's expire command
/// re-validates state anyway, so a briefly stale entry is harmless.
#[derive(Clone)]
pub struct ActiveHoldsView {
    state: Arc<RwLock<ActiveHoldsState>>,
}

impl ActiveHoldsView {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ActiveHoldsState {
                holds: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Returns the holds whose deadline has passed.
    pub async fn expired_before(&self, now: DateTime<Utc>) -> Vec<HoldEntry> {
        self.state
            .read()
            .await
            .holds
            .values()
            .filter(|entry| entry.expires_at < now)
            .cloned()
            .collect()
    }

    /// Returns the number of live holds.
    pub async fn active_count(&self) -> usize {
        self.state.read().await.holds.len()
    }

    /// Returns the hold entry for a booking, if still live.
    pub async fn entry(&self, booking_id: AggregateId) -> Option<HoldEntry> {
        self.state.read().await.holds.get(&booking_id).cloned()
    }
}

impl Default for ActiveHoldsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ActiveHoldsView {
    fn name(&self) -> &'static str {
        "ActiveHoldsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Booking" {
            let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;
            let booking_id = event.aggregate_id;

            let mut state = self.state.write().await;
            match booking_event {
                BookingEvent::BookingCreated(data) => {
                    state.holds.insert(
                        booking_id,
                        HoldEntry {
                            booking_id,
                            screening_id: data.screening.screening_id,
                            expires_at: data.expires_at,
                        },
                    );
                }
                BookingEvent::BookingPaid(_)
                | BookingEvent::BookingCancelled(_)
                | BookingEvent::BookingExpired(_) => {
                    state.holds.remove(&booking_id);
                }
                _ => {}
            }
            state.position = state.position.advance();
            return Ok(());
        }

        let mut state = self.state.write().await;
        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.holds.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for ActiveHoldsView {
    fn name(&self) -> &'static str {
        "ActiveHoldsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.holds.len()).unwrap_or(0)
    }
}
