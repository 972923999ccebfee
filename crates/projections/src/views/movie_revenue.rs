//! Movie revenue ledger — per movie, per cinema, per calendar day.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{CinemaId, MovieId};
use domain::{BookingEvent, Money};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Additive ledger entry keyed by (movie, cinema, date).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRevenue {
    pub movie_id: MovieId,
    pub cinema_id: CinemaId,
    pub date: NaiveDate,
    pub ticket_revenue: Money,
    pub tickets_sold: i64,
}

struct MovieRevenueState {
    entries: HashMap<(MovieId, CinemaId, NaiveDate), MovieRevenue>,
    position: ProjectionPosition,
}

/// Read model for the per-movie revenue ledger.
#[derive(Clone)]
pub struct MovieRevenueView {
    state: Arc<RwLock<MovieRevenueState>>,
}

impl MovieRevenueView {
    /// Creates a new empty ledger view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MovieRevenueState {
                entries: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets the entry for a movie, cinema and date.
    pub async fn revenue(
        &self,
        movie_id: MovieId,
        cinema_id: CinemaId,
        date: NaiveDate,
    ) -> Option<MovieRevenue> {
        self.state
            .read()
            .await
            .entries
            .get(&(movie_id, cinema_id, date))
            .cloned()
    }

    /// Gets all entries.
    pub async fn all(&self) -> Vec<MovieRevenue> {
        self.state.read().await.entries.values().cloned().collect()
    }

    async fn upsert(
        &self,
        movie_id: MovieId,
        cinema_id: CinemaId,
        date: NaiveDate,
        ticket_delta: Money,
        tickets_delta: i64,
    ) {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .entry((movie_id, cinema_id, date))
            .or_insert(MovieRevenue {
                movie_id,
                cinema_id,
                date,
                ticket_revenue: Money::zero(),
                tickets_sold: 0,
            });
        entry.ticket_revenue += ticket_delta;
        entry.tickets_sold += tickets_delta;
    }
}

impl Default for MovieRevenueView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for MovieRevenueView {
    fn name(&self) -> &'static str {
        "MovieRevenueView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Booking" {
            let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;

            match booking_event {
                BookingEvent::BookingPaid(data) => {
                    let ticket_revenue = data.total - data.combo_subtotal;
                    self.upsert(
                        data.movie_id,
                        data.cinema_id,
                        data.paid_at.date_naive(),
                        ticket_revenue,
                        data.tickets.len() as i64,
                    )
                    .await;
                }
                BookingEvent::BookingRefunded(data) => {
                    let ticket_revenue = data.total - data.combo_subtotal;
                    self.upsert(
                        data.movie_id,
                        data.cinema_id,
                        data.refunded_at.date_naive(),
                        Money::zero() - ticket_revenue,
                        -(data.ticket_ids.len() as i64),
                    )
                    .await;
                }
                _ => {}
            }
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
        state.entries.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for MovieRevenueView {
    fn name(&self) -> &'static str {
        "MovieRevenueView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.entries.len()).unwrap_or(0)
    }
}
