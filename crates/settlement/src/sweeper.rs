//! Background sweepers: hold expiration and ticket aging.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::{BookingError, BookingService, Catalog, DomainError, LoyaltyService};
use event_store::EventStore;
use projections::{ActiveHoldsView, Projection, ProjectionProcessor, TicketsView};

use crate::directory::InvoiceDirectory;
use crate::error::Result;
use crate::invoice::InvoiceHandler;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Lapsed holds observed in the index.
    pub scanned: usize,
    /// Bookings this pass transitioned to Expired.
    pub expired: usize,
    /// Bookings another path (pay/cancel) had already transitioned.
    pub already_settled: usize,
    /// Bookings whose cascade failed; retried next pass.
    pub failed: usize,
}

/// Periodic task reclaiming seats from lapsed holds.
///
/// Each pass refreshes the hold index, expires every lapsed booking it
/// finds, and cascades to the booking's pending invoice and payment
/// attempts. Failures are isolated per booking: one bad cascade never
/// aborts the rest of the batch. Races with user-initiated pay/cancel are
/// resolved by the expire command's own state re-check; losing that race
/// is counted, not raised.
pub struct ExpirationSweeper<S, C, L>
where
    S: EventStore + Clone,
    C: Catalog,
    L: LoyaltyService,
{
    bookings: Arc<BookingService<S, C, L>>,
    invoices: InvoiceHandler<S>,
    holds: ActiveHoldsView,
    directory: InvoiceDirectory,
    processor: ProjectionProcessor<S>,
}

impl<S, C, L> ExpirationSweeper<S, C, L>
where
    S: EventStore + Clone + 'static,
    C: Catalog + 'static,
    L: LoyaltyService + 'static,
{
    /// Creates a sweeper over the given store and booking service.
    pub fn new(store: S, bookings: Arc<BookingService<S, C, L>>) -> Self {
        let holds = ActiveHoldsView::new();
        let directory = InvoiceDirectory::new();
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(holds.clone()) as Box<dyn Projection>);
        processor.register(Box::new(directory.clone()) as Box<dyn Projection>);

        Self {
            bookings,
            invoices: InvoiceHandler::new(store),
            holds,
            directory,
            processor,
        }
    }

    /// Runs a single sweep pass at the given instant.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        self.processor.run_catch_up().await?;

        let lapsed = self.holds.expired_before(now).await;
        let mut report = SweepReport {
            scanned: lapsed.len(),
            ..SweepReport::default()
        };

        for entry in lapsed {
            match self.bookings.expire(entry.booking_id, now).await {
                Ok(_) => {
                    report.expired += 1;
                    metrics::counter!("holds_expired_total").increment(1);

                    if let Err(e) = self.cascade_invoice(entry.booking_id, now).await {
                        tracing::warn!(
                            booking_id = %entry.booking_id,
                            error = %e,
                            "invoice cascade failed for expired booking"
                        );
                        report.failed += 1;
                    }
                }
                Err(DomainError::Booking(BookingError::InvalidStateTransition { .. })) => {
                    // A pay or cancel observed the booking first; their
                    // transition already released or sold the seats.
                    report.already_settled += 1;
                    tracing::debug!(
                        booking_id = %entry.booking_id,
                        "hold already settled by another path"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        booking_id = %entry.booking_id,
                        error = %e,
                        "failed to expire booking; will retry next sweep"
                    );
                }
            }
        }

        if report.scanned > 0 {
            tracing::info!(
                scanned = report.scanned,
                expired = report.expired,
                already_settled = report.already_settled,
                failed = report.failed,
                "expiration sweep complete"
            );
        }

        Ok(report)
    }

    /// Fails the booking's pending invoice and payment attempts, if any.
    async fn cascade_invoice(
        &self,
        booking_id: common::AggregateId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(invoice_id) = self.directory.invoice_for_booking(booking_id).await else {
            return Ok(());
        };

        self.invoices
            .execute(invoice_id, |invoice| invoice.fail_pending(now))
            .await?;

        Ok(())
    }

    /// Spawns the sweeper on a fixed interval.
    ///
    /// The task runs until the handle is aborted (typically at shutdown).
    pub fn spawn(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    tracing::error!(error = %e, "expiration sweep pass failed");
                }
            }
        })
    }
}

/// Periodic task aging out tickets past their screening end.
///
/// Independent of the hold sweeper; operates on the shared ticket
/// registry.
pub struct TicketSweeper<S: EventStore> {
    tickets: TicketsView,
    processor: Arc<ProjectionProcessor<S>>,
}

impl<S: EventStore + Clone + 'static> TicketSweeper<S> {
    /// Creates a sweeper over its own ticket registry.
    pub fn new(store: S) -> Self {
        let tickets = TicketsView::new();
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(tickets.clone()) as Box<dyn Projection>);
        Self {
            tickets,
            processor: Arc::new(processor),
        }
    }

    /// Creates a sweeper over a shared ticket registry.
    ///
    /// The registry must be registered with the given processor; this
    /// sweeper only refreshes and ages it.
    pub fn over(tickets: TicketsView, processor: Arc<ProjectionProcessor<S>>) -> Self {
        Self { tickets, processor }
    }

    /// Runs a single pass; returns how many tickets were expired.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        self.processor.run_catch_up().await?;
        let expired = self.tickets.expire_overdue(now).await;
        if expired > 0 {
            metrics::counter!("tickets_expired_total").increment(expired as u64);
            tracing::info!(expired, "ticket sweep complete");
        }
        Ok(expired)
    }

    /// Spawns the sweeper on a fixed interval.
    pub fn spawn(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    tracing::error!(error = %e, "ticket sweep pass failed");
                }
            }
        })
    }
}
