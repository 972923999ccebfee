//! Ticket registry — issued tickets, check-in, refund and expiry upkeep.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId, ScreeningId};
use domain::{BookingEvent, ComboLine, SeatId};
use event_store::EventEnvelope;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ProjectionError;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;
use crate::Result;

/// Lifecycle of an issued ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Active,
    Used,
    Expired,
}

impl TicketStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "Active",
            TicketStatus::Used => "Used",
            TicketStatus::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One issued ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    pub ticket_id: Uuid,
    pub code: String,
    pub seat_id: SeatId,
    pub booking_id: AggregateId,
    pub screening_id: ScreeningId,
    pub customer: Option<CustomerId>,
    pub status: TicketStatus,
    pub expires_at: DateTime<Utc>,
}

struct TicketsState {
    tickets: HashMap<Uuid, TicketRecord>,
    by_code: HashMap<String, Uuid>,
    /// Combo redemptions remaining per booking, decremented at check-in.
    combos: HashMap<AggregateId, Vec<ComboLine>>,
    position: ProjectionPosition,
}

/// Read model for issued tickets.
///
/// Fed by `BookingPaid` (issue) and `BookingRefunded` (expire); the ticket
/// sweeper ages out tickets past their screening end, and check-in drives
/// `mark_used` / `redeem_combo`.
#[derive(Clone)]
pub struct TicketsView {
    state: Arc<RwLock<TicketsState>>,
}

impl TicketsView {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TicketsState {
                tickets: HashMap::new(),
                by_code: HashMap::new(),
                combos: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a ticket by its scannable code.
    pub async fn by_code(&self, code: &str) -> Option<TicketRecord> {
        let state = self.state.read().await;
        let id = state.by_code.get(code)?;
        state.tickets.get(id).cloned()
    }

    /// Gets all tickets of a booking.
    pub async fn of_booking(&self, booking_id: AggregateId) -> Vec<TicketRecord> {
        self.state
            .read()
            .await
            .tickets
            .values()
            .filter(|t| t.booking_id == booking_id)
            .cloned()
            .collect()
    }

    /// Returns the combo lines (with remaining redemptions) of a booking.
    pub async fn combos_of_booking(&self, booking_id: AggregateId) -> Vec<ComboLine> {
        self.state
            .read()
            .await
            .combos
            .get(&booking_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Check-in: marks a scanned ticket used, exactly once.
    pub async fn mark_used(&self, code: &str, now: DateTime<Utc>) -> Result<TicketRecord> {
        let mut state = self.state.write().await;
        let ticket_id = *state
            .by_code
            .get(code)
            .ok_or_else(|| ProjectionError::Ticket(format!("unknown ticket code {code}")))?;

        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| ProjectionError::Ticket(format!("unknown ticket code {code}")))?;

        match ticket.status {
            TicketStatus::Used => {
                return Err(ProjectionError::Ticket(format!(
                    "ticket {code} already used"
                )));
            }
            TicketStatus::Expired => {
                return Err(ProjectionError::Ticket(format!("ticket {code} expired")));
            }
            TicketStatus::Active => {}
        }

        if now > ticket.expires_at {
            ticket.status = TicketStatus::Expired;
            return Err(ProjectionError::Ticket(format!("ticket {code} expired")));
        }

        ticket.status = TicketStatus::Used;
        Ok(ticket.clone())
    }

    /// Check-in: redeems one unit of a booking's combo line.
    pub async fn redeem_combo(&self, booking_id: AggregateId, combo_id: &str) -> Result<u32> {
        let mut state = self.state.write().await;
        let lines = state
            .combos
            .get_mut(&booking_id)
            .ok_or_else(|| ProjectionError::Ticket(format!("no combos for booking {booking_id}")))?;

        let line = lines
            .iter_mut()
            .find(|l| l.combo_id == combo_id)
            .ok_or_else(|| ProjectionError::Ticket(format!("no combo {combo_id} on booking")))?;

        if line.remaining == 0 {
            return Err(ProjectionError::Ticket(format!(
                "combo {combo_id} fully redeemed"
            )));
        }

        line.remaining -= 1;
        Ok(line.remaining)
    }

    /// Ages out active tickets whose screening has ended.
    ///
    /// Returns how many tickets were expired.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.write().await;
        let mut expired = 0;
        for ticket in state.tickets.values_mut() {
            if ticket.status == TicketStatus::Active && now > ticket.expires_at {
                ticket.status = TicketStatus::Expired;
                expired += 1;
            }
        }
        expired
    }
}

impl Default for TicketsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for TicketsView {
    fn name(&self) -> &'static str {
        "TicketsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Booking" {
            let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;
            let booking_id = event.aggregate_id;

            let mut state = self.state.write().await;
            match booking_event {
                BookingEvent::CombosReplaced(data) => {
                    state.combos.insert(booking_id, data.lines);
                }
                BookingEvent::BookingPaid(data) => {
                    for ticket in data.tickets {
                        state.by_code.insert(ticket.code.clone(), ticket.ticket_id);
                        state.tickets.insert(
                            ticket.ticket_id,
                            TicketRecord {
                                ticket_id: ticket.ticket_id,
                                code: ticket.code,
                                seat_id: ticket.seat_id,
                                booking_id,
                                screening_id: data.screening_id,
                                customer: data.customer,
                                status: TicketStatus::Active,
                                expires_at: ticket.expires_at,
                            },
                        );
                    }
                }
                BookingEvent::BookingRefunded(data) => {
                    for ticket_id in data.ticket_ids {
                        if let Some(ticket) = state.tickets.get_mut(&ticket_id) {
                            ticket.status = TicketStatus::Expired;
                        }
                    }
                    state.combos.remove(&booking_id);
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
        state.tickets.clear();
        state.by_code.clear();
        state.combos.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for TicketsView {
    fn name(&self) -> &'static str {
        "TicketsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.tickets.len()).unwrap_or(0)
    }
}
