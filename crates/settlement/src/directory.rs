//! Booking-to-invoice directory.
//!
//! A settlement-owned read model enforcing the one-invoice-per-booking
//! shape: checkout consults it before opening a new invoice.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use event_store::EventEnvelope;
use projections::{Projection, ProjectionPosition};
use tokio::sync::RwLock;

use crate::events::InvoiceEvent;

struct DirectoryState {
    by_booking: HashMap<AggregateId, AggregateId>,
    position: ProjectionPosition,
}

/// Maps bookings to their invoice aggregate.
#[derive(Clone)]
pub struct InvoiceDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InvoiceDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                by_booking: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Returns the invoice for a booking, if one was opened.
    pub async fn invoice_for_booking(&self, booking_id: AggregateId) -> Option<AggregateId> {
        self.state.read().await.by_booking.get(&booking_id).copied()
    }

    /// Returns the number of known invoices.
    pub async fn len(&self) -> usize {
        self.state.read().await.by_booking.len()
    }

    /// Returns true when no invoices are known.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.by_booking.is_empty()
    }
}

impl Default for InvoiceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for InvoiceDirectory {
    fn name(&self) -> &'static str {
        "InvoiceDirectory"
    }

    async fn handle(&self, event: &EventEnvelope) -> projections::Result<()> {
        if event.aggregate_type == "Invoice" {
            let invoice_event: InvoiceEvent = serde_json::from_value(event.payload.clone())?;

            if let InvoiceEvent::InvoiceOpened(data) = invoice_event {
                let mut state = self.state.write().await;
                state.by_booking.insert(data.booking_id, data.invoice_id);
                state.position = state.position.advance();
                return Ok(());
            }
        }

        let mut state = self.state.write().await;
        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> projections::Result<()> {
        let mut state = self.state.write().await;
        state.by_booking.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}
