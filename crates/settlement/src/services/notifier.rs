//! Notification/ticket-delivery service boundary.
//!
//! Fire-and-forget from the engine's perspective: delivery failures are
//! logged and never roll back settled state.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{AggregateId, CustomerId};
use domain::IssuedTicket;

use crate::error::{Result, SettlementError};

/// Event payload for a "tickets issued" notification.
#[derive(Debug, Clone)]
pub struct TicketsIssuedNotice {
    pub booking_id: AggregateId,
    pub customer: Option<CustomerId>,
    pub tickets: Vec<IssuedTicket>,
}

/// Event payload for a "booking refunded" notification.
#[derive(Debug, Clone)]
pub struct BookingRefundedNotice {
    pub booking_id: AggregateId,
    pub customer: Option<CustomerId>,
}

/// Outbound notification boundary.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announces issued tickets for delivery.
    async fn tickets_issued(&self, notice: TicketsIssuedNotice) -> Result<()>;

    /// Announces a refunded booking.
    async fn booking_refunded(&self, notice: BookingRefundedNotice) -> Result<()>;
}

#[derive(Debug, Default)]
struct NotifierState {
    issued: Vec<TicketsIssuedNotice>,
    refunded: Vec<BookingRefundedNotice>,
    fail: bool,
}

/// In-memory notifier for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<NotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail deliveries.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns the number of tickets-issued notices delivered.
    pub fn issued_count(&self) -> usize {
        self.state.read().unwrap().issued.len()
    }

    /// Returns the number of refund notices delivered.
    pub fn refunded_count(&self) -> usize {
        self.state.read().unwrap().refunded.len()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn tickets_issued(&self, notice: TicketsIssuedNotice) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(SettlementError::Notification(
                "notification channel down".to_string(),
            ));
        }
        state.issued.push(notice);
        Ok(())
    }

    async fn booking_refunded(&self, notice: BookingRefundedNotice) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(SettlementError::Notification(
                "notification channel down".to_string(),
            ));
        }
        state.refunded.push(notice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_notices() {
        let notifier = InMemoryNotifier::new();
        notifier
            .tickets_issued(TicketsIssuedNotice {
                booking_id: AggregateId::new(),
                customer: None,
                tickets: vec![],
            })
            .await
            .unwrap();

        assert_eq!(notifier.issued_count(), 1);
        assert_eq!(notifier.refunded_count(), 0);
    }

    #[tokio::test]
    async fn failure_mode_surfaces_error() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail(true);

        let result = notifier
            .booking_refunded(BookingRefundedNotice {
                booking_id: AggregateId::new(),
                customer: None,
            })
            .await;
        assert!(result.is_err());
        assert_eq!(notifier.refunded_count(), 0);
    }
}
