//! Daily revenue ledger — per cinema, per calendar day.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::CinemaId;
use domain::{BookingEvent, Money};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Additive revenue ledger entry keyed by (cinema, date).
///
/// `ticket_revenue` is the settled total minus the combo portion; a refund
/// applies the same deltas negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRevenueSummary {
    pub cinema_id: CinemaId,
    pub date: NaiveDate,
    pub ticket_revenue: Money,
    pub combo_revenue: Money,
    pub transactions: i64,
}

struct DailyRevenueState {
    summaries: HashMap<(CinemaId, NaiveDate), DailyRevenueSummary>,
    position: ProjectionPosition,
}

/// Read model for the per-cinema daily revenue ledger.
#[derive(Clone)]
pub struct DailyRevenueView {
    state: Arc<RwLock<DailyRevenueState>>,
}

impl DailyRevenueView {
    /// Creates a new empty ledger view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DailyRevenueState {
                summaries: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets the summary for a cinema and date.
    pub async fn summary(&self, cinema_id: CinemaId, date: NaiveDate) -> Option<DailyRevenueSummary> {
        self.state
            .read()
            .await
            .summaries
            .get(&(cinema_id, date))
            .cloned()
    }

    /// Gets all summaries.
    pub async fn all(&self) -> Vec<DailyRevenueSummary> {
        self.state.read().await.summaries.values().cloned().collect()
    }

    async fn upsert(
        &self,
        cinema_id: CinemaId,
        date: NaiveDate,
        ticket_delta: Money,
        combo_delta: Money,
        transaction_delta: i64,
    ) {
        let mut state = self.state.write().await;
        let entry = state
            .summaries
            .entry((cinema_id, date))
            .or_insert(DailyRevenueSummary {
                cinema_id,
                date,
                ticket_revenue: Money::zero(),
                combo_revenue: Money::zero(),
                transactions: 0,
            });
        entry.ticket_revenue += ticket_delta;
        entry.combo_revenue += combo_delta;
        entry.transactions += transaction_delta;
    }
}

impl Default for DailyRevenueView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for DailyRevenueView {
    fn name(&self) -> &'static str {
        "DailyRevenueView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Booking" {
            let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;

            match booking_event {
                BookingEvent::BookingPaid(data) => {
                    let ticket_revenue = data.total - data.combo_subtotal;
                    self.upsert(
                        data.cinema_id,
                        data.paid_at.date_naive(),
                        ticket_revenue,
                        data.combo_subtotal,
                        1,
                    )
                    .await;
                }
                BookingEvent::BookingRefunded(data) => {
                    let ticket_revenue = data.total - data.combo_subtotal;
                    self.upsert(
                        data.cinema_id,
                        data.refunded_at.date_naive(),
                        Money::zero() - ticket_revenue,
                        Money::zero() - data.combo_subtotal,
                        -1,
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
        state.summaries.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for DailyRevenueView {
    fn name(&self) -> &'static str {
        "DailyRevenueView"
    }

    fn count(&self) -> usize {
        // Callers needing an exact count should use the async queries; this
        // is a best-effort snapshot for diagnostics.
        self.state
            .try_read()
            .map(|s| s.summaries.len())
            .unwrap_or(0)
    }
}
