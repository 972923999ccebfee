//! Settlement coordinator: checkout, gateway callbacks and refunds.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    BookingError, BookingEvent, BookingService, BookingState, Catalog, ConfirmPayment,
    DomainError, LoyaltyService, Money, RefundBooking,
};
use event_store::EventStore;
use projections::{Projection, ProjectionProcessor};
use uuid::Uuid;

use crate::directory::InvoiceDirectory;
use crate::error::{InvoiceError, Result, SettlementError};
use crate::fence::{ProcessingLog, SettlementKind};
use crate::gateway::TransactionRef;
use crate::invoice::{Invoice, InvoiceHandler};
use crate::services::{BookingRefundedNotice, Notifier, TicketsIssuedNotice};

/// A registered payment attempt handed back to the client for redirect.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub booking_id: AggregateId,
    pub invoice_id: AggregateId,
    pub payment_id: Uuid,
    pub transaction_ref: String,
    pub amount: Money,
}

/// Result of a success-callback settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Effects were applied by this call.
    Settled {
        booking_id: AggregateId,
        tickets: usize,
    },
    /// The fence was already claimed: a duplicate callback, success-no-op.
    AlreadyProcessed,
}

/// Result of a refund request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Reversal was applied by this call.
    Refunded {
        booking_id: AggregateId,
        points_reversed: i64,
    },
    /// The reversal fence was already claimed: an admin retry, no-op.
    AlreadyProcessed,
}

/// Drives payments through invoices into booking settlement, loyalty
/// deltas and notifications — exactly once per payment.
///
/// The booking transitions and seat sales commit first; the ledgers follow
/// from the booking's paid/refunded events via the projections. The fence
/// is claimed before any effect and released again if the settlement fails
/// partway, so a clean retry stays possible.
pub struct SettlementCoordinator<S, C, L, P, N>
where
    S: EventStore + Clone,
    C: Catalog,
    L: LoyaltyService,
    P: ProcessingLog,
    N: Notifier,
{
    bookings: Arc<BookingService<S, C, L>>,
    invoices: InvoiceHandler<S>,
    directory: InvoiceDirectory,
    directory_processor: ProjectionProcessor<S>,
    fence: P,
    loyalty: L,
    notifier: N,
}

impl<S, C, L, P, N> SettlementCoordinator<S, C, L, P, N>
where
    S: EventStore + Clone + 'static,
    C: Catalog,
    L: LoyaltyService,
    P: ProcessingLog,
    N: Notifier,
{
    /// Creates a new settlement coordinator.
    pub fn new(
        store: S,
        bookings: Arc<BookingService<S, C, L>>,
        loyalty: L,
        fence: P,
        notifier: N,
    ) -> Self {
        let directory = InvoiceDirectory::new();
        let mut directory_processor = ProjectionProcessor::new(store.clone());
        directory_processor.register(Box::new(directory.clone()) as Box<dyn Projection>);

        Self {
            bookings,
            invoices: InvoiceHandler::new(store),
            directory,
            directory_processor,
            fence,
            loyalty,
            notifier,
        }
    }

    /// Opens (or reuses) the booking's invoice and registers a payment
    /// attempt, returning the session the client takes to the gateway.
    #[tracing::instrument(skip(self))]
    pub async fn begin_payment(
        &self,
        booking_id: AggregateId,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(SettlementError::Domain)?
            .ok_or(SettlementError::BookingNotFound(booking_id))?;

        if booking.state() != BookingState::Hold {
            return Err(SettlementError::BookingNotPayable(format!(
                "booking is {}",
                booking.state()
            )));
        }
        if booking.hold_lapsed(now) {
            return Err(SettlementError::BookingExpired);
        }

        self.directory_processor.run_catch_up().await?;

        let invoice_id = match self.directory.invoice_for_booking(booking_id).await {
            Some(id) => id,
            None => {
                let invoice_id = AggregateId::new();
                let amount = booking.total();
                self.invoices
                    .execute(invoice_id, |invoice| {
                        invoice.open(invoice_id, booking_id, amount, now)
                    })
                    .await?;
                invoice_id
            }
        };

        let invoice = self.invoices.load(invoice_id).await?;

        // An attempt already in flight is reused; the client just retries
        // the same gateway redirect.
        if let Some(pending) = invoice.pending_payment() {
            return Ok(CheckoutSession {
                booking_id,
                invoice_id,
                payment_id: pending.payment_id,
                transaction_ref: pending.transaction_ref.clone(),
                amount: pending.amount,
            });
        }

        if !invoice.status().is_pending() {
            return Err(SettlementError::BookingNotPayable(format!(
                "invoice is {}",
                invoice.status()
            )));
        }

        let payment_id = Uuid::new_v4();
        let transaction_ref = TransactionRef::new(invoice_id, payment_id).to_string();
        let amount = invoice.amount();
        let reference = transaction_ref.clone();

        self.invoices
            .execute(invoice_id, |invoice| {
                invoice.register_payment(payment_id, reference.clone(), amount, now)
            })
            .await?;

        Ok(CheckoutSession {
            booking_id,
            invoice_id,
            payment_id,
            transaction_ref,
            amount,
        })
    }

    /// Applies a gateway success callback.
    ///
    /// The caller has already verified the callback signature. Duplicate
    /// deliveries resolve to `AlreadyProcessed` without reapplying any
    /// effect.
    #[tracing::instrument(skip(self))]
    pub async fn settle(&self, reference: &str, now: DateTime<Utc>) -> Result<SettlementOutcome> {
        let parsed = TransactionRef::parse(reference)?;

        if !self
            .fence
            .claim(parsed.payment_id, SettlementKind::Posting)
            .await?
        {
            metrics::counter!("settlement_duplicates_total").increment(1);
            tracing::debug!(%reference, "duplicate settlement callback, already processed");
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        match self.apply_settlement(parsed, now).await {
            Ok(outcome) => {
                metrics::counter!("settlements_total").increment(1);
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release_err) = self
                    .fence
                    .release(parsed.payment_id, SettlementKind::Posting)
                    .await
                {
                    tracing::error!(
                        payment_id = %parsed.payment_id,
                        error = %release_err,
                        "failed to release settlement fence after error"
                    );
                }
                Err(e)
            }
        }
    }

    async fn apply_settlement(
        &self,
        parsed: TransactionRef,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome> {
        let invoice = self
            .invoices
            .load_existing(parsed.invoice_id)
            .await?
            .ok_or(SettlementError::InvoiceNotFound(parsed.invoice_id))?;

        let booking_id = invoice
            .booking_id()
            .ok_or(SettlementError::InvoiceNotFound(parsed.invoice_id))?;

        if invoice.payment(parsed.payment_id).is_none() {
            return Err(InvoiceError::UnknownPayment {
                payment_id: parsed.payment_id,
            }
            .into());
        }

        // Booking transition first: it finalizes the totals and seat counts
        // everything downstream snapshots.
        let confirmed = match self
            .bookings
            .confirm_payment(ConfirmPayment::new(booking_id, parsed.payment_id), now)
            .await
        {
            Ok(result) => result,
            Err(DomainError::Booking(BookingError::HoldLapsed)) => {
                // The money arrived after the hold collapsed. Fail the
                // attempt and surface the distinct "expired" signal.
                if let Err(e) = self
                    .invoices
                    .execute(parsed.invoice_id, |invoice| {
                        invoice.fail_payment(parsed.payment_id, "hold lapsed before settlement", now)
                    })
                    .await
                {
                    tracing::warn!(%booking_id, error = %e, "failed to record lapsed-hold payment failure");
                }
                return Err(SettlementError::BookingExpired);
            }
            Err(e) => return Err(SettlementError::Domain(e)),
        };

        self.invoices
            .execute(parsed.invoice_id, |invoice| {
                invoice.mark_paid(parsed.payment_id, now)
            })
            .await?;

        let paid = confirmed.events.iter().find_map(|event| match event {
            BookingEvent::BookingPaid(data) => Some(data.clone()),
            _ => None,
        });

        let Some(paid) = paid else {
            // confirm_payment emits exactly one BookingPaid; reaching this
            // point without one is a bug upstream.
            return Err(SettlementError::BookingNotPayable(
                "settlement produced no paid event".to_string(),
            ));
        };

        // Loyalty credit is best-effort after commit: a failure is logged
        // and never rolls back the settled booking.
        if let Some(customer) = paid.customer {
            let points = domain::loyalty_points_earned(paid.total, paid.discount);
            if points != 0
                && let Err(e) = self.loyalty.adjust_points(customer, points).await
            {
                tracing::warn!(%booking_id, %customer, points, error = %e, "loyalty credit failed");
            }
        }

        if let Err(e) = self
            .notifier
            .tickets_issued(TicketsIssuedNotice {
                booking_id,
                customer: paid.customer,
                tickets: paid.tickets.clone(),
            })
            .await
        {
            tracing::warn!(%booking_id, error = %e, "tickets-issued notification failed");
        }

        Ok(SettlementOutcome::Settled {
            booking_id,
            tickets: paid.tickets.len(),
        })
    }

    /// Applies a gateway failure callback.
    ///
    /// The payment attempt is marked failed; the invoice stays pending and
    /// the booking is left to expire or retry. Duplicate failure callbacks
    /// are no-ops.
    #[tracing::instrument(skip(self))]
    pub async fn fail(
        &self,
        reference: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let parsed = TransactionRef::parse(reference)?;

        self.invoices
            .load_existing(parsed.invoice_id)
            .await?
            .ok_or(SettlementError::InvoiceNotFound(parsed.invoice_id))?;

        let reason = reason.to_string();
        self.invoices
            .execute(parsed.invoice_id, |invoice| {
                invoice.fail_payment(parsed.payment_id, reason.clone(), now)
            })
            .await?;

        metrics::counter!("settlement_failures_total").increment(1);
        Ok(())
    }

    /// Refunds a paid booking: reversal fenced by the settled payment id.
    ///
    /// An admin retry of the same refund resolves to `AlreadyProcessed`
    /// instead of double-reversing points and revenue.
    #[tracing::instrument(skip(self))]
    pub async fn refund(
        &self,
        booking_id: AggregateId,
        now: DateTime<Utc>,
    ) -> Result<RefundOutcome> {
        self.directory_processor.run_catch_up().await?;

        let invoice_id = self
            .directory
            .invoice_for_booking(booking_id)
            .await
            .ok_or(SettlementError::InvoiceNotFound(booking_id))?;

        let invoice = self.invoices.load(invoice_id).await?;

        let payment_id = invoice
            .settled_payment()
            .map(|p| p.payment_id)
            .ok_or(SettlementError::NothingToRefund(booking_id))?;

        if !self
            .fence
            .claim(payment_id, SettlementKind::Reversal)
            .await?
        {
            metrics::counter!("refund_duplicates_total").increment(1);
            tracing::debug!(%booking_id, "duplicate refund request, already processed");
            return Ok(RefundOutcome::AlreadyProcessed);
        }

        match self.apply_refund(booking_id, invoice_id, now).await {
            Ok(outcome) => {
                metrics::counter!("refunds_total").increment(1);
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release_err) = self
                    .fence
                    .release(payment_id, SettlementKind::Reversal)
                    .await
                {
                    tracing::error!(
                        %payment_id,
                        error = %release_err,
                        "failed to release reversal fence after error"
                    );
                }
                Err(e)
            }
        }
    }

    async fn apply_refund(
        &self,
        booking_id: AggregateId,
        invoice_id: AggregateId,
        now: DateTime<Utc>,
    ) -> Result<RefundOutcome> {
        let refunded = self
            .bookings
            .refund(RefundBooking::new(booking_id), now)
            .await
            .map_err(SettlementError::Domain)?;

        self.invoices
            .execute(invoice_id, |invoice| invoice.refund(now))
            .await?;

        let data = refunded.events.iter().find_map(|event| match event {
            BookingEvent::BookingRefunded(data) => Some(data.clone()),
            _ => None,
        });

        let Some(data) = data else {
            return Err(SettlementError::NothingToRefund(booking_id));
        };

        // Reverse exactly what settlement credited, best-effort.
        if let Some(customer) = data.customer {
            if data.points_reversed != 0
                && let Err(e) = self
                    .loyalty
                    .adjust_points(customer, -data.points_reversed)
                    .await
            {
                tracing::warn!(%booking_id, %customer, error = %e, "loyalty reversal failed");
            }
        }

        if let Err(e) = self
            .notifier
            .booking_refunded(BookingRefundedNotice {
                booking_id,
                customer: data.customer,
            })
            .await
        {
            tracing::warn!(%booking_id, error = %e, "refund notification failed");
        }

        Ok(RefundOutcome::Refunded {
            booking_id,
            points_reversed: data.points_reversed,
        })
    }

    /// Loads an invoice by ID.
    pub async fn get_invoice(&self, invoice_id: AggregateId) -> Result<Option<Invoice>> {
        self.invoices.load_existing(invoice_id).await
    }

    /// Returns the invoice aggregate id for a booking, if one exists.
    pub async fn invoice_for_booking(
        &self,
        booking_id: AggregateId,
    ) -> Result<Option<AggregateId>> {
        self.directory_processor.run_catch_up().await?;
        Ok(self.directory.invoice_for_booking(booking_id).await)
    }
}
