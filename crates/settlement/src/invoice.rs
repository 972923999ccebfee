//! Invoice aggregate implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Money};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InvoiceError;
use crate::events::{
    InvoiceEvent, InvoiceFailedData, InvoiceOpenedData, InvoiceRefundedData, PaymentFailedData,
    PaymentRegisteredData, PaymentSucceededData,
};
use crate::state::{InvoiceStatus, PaymentStatus};

/// One gateway transaction attempt against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: Uuid,
    pub transaction_ref: String,
    pub amount: Money,
    pub status: PaymentStatus,
    pub registered_at: DateTime<Utc>,
}

/// Invoice aggregate: one-to-one with a booking.
///
/// Tracks payment attempts against the booking's total. The settlement
/// coordinator drives it; the expiration sweeper fails it while pending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invoice {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    booking_id: Option<AggregateId>,

    amount: Money,

    status: InvoiceStatus,

    payments: BTreeMap<Uuid, PaymentRecord>,
}

impl Aggregate for Invoice {
    type Event = InvoiceEvent;
    type Error = InvoiceError;

    fn aggregate_type() -> &'static str {
        "Invoice"
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
            InvoiceEvent::InvoiceOpened(data) => {
                self.id = Some(data.invoice_id);
                self.booking_id = Some(data.booking_id);
                self.amount = data.amount;
                self.status = InvoiceStatus::Pending;
            }
            InvoiceEvent::PaymentRegistered(data) => {
                self.payments.insert(
                    data.payment_id,
                    PaymentRecord {
                        payment_id: data.payment_id,
                        transaction_ref: data.transaction_ref,
                        amount: data.amount,
                        status: PaymentStatus::Pending,
                        registered_at: data.registered_at,
                    },
                );
            }
            InvoiceEvent::PaymentSucceeded(data) => {
                if let Some(payment) = self.payments.get_mut(&data.payment_id) {
                    payment.status = PaymentStatus::Success;
                }
                self.status = InvoiceStatus::Paid;
            }
            InvoiceEvent::PaymentFailed(data) => {
                if let Some(payment) = self.payments.get_mut(&data.payment_id) {
                    payment.status = PaymentStatus::Failed;
                }
            }
            InvoiceEvent::InvoiceFailed(_) => {
                self.status = InvoiceStatus::Failed;
                for payment in self.payments.values_mut() {
                    if payment.status == PaymentStatus::Pending {
                        payment.status = PaymentStatus::Failed;
                    }
                }
            }
            InvoiceEvent::InvoiceRefunded(_) => {
                self.status = InvoiceStatus::Refunded;
            }
        }
    }
}

// Query methods
impl Invoice {
    /// Returns the booking this invoice belongs to.
    pub fn booking_id(&self) -> Option<AggregateId> {
        self.booking_id
    }

    /// Returns the invoiced amount.
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the invoice status.
    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// Returns all payment attempts.
    pub fn payments(&self) -> impl Iterator<Item = &PaymentRecord> {
        self.payments.values()
    }

    /// Returns a payment attempt by ID.
    pub fn payment(&self, payment_id: Uuid) -> Option<&PaymentRecord> {
        self.payments.get(&payment_id)
    }

    /// Returns the pending payment attempt, if one is in flight.
    pub fn pending_payment(&self) -> Option<&PaymentRecord> {
        self.payments
            .values()
            .find(|p| p.status == PaymentStatus::Pending)
    }

    /// Returns the settled payment, once the invoice is paid.
    pub fn settled_payment(&self) -> Option<&PaymentRecord> {
        self.payments
            .values()
            .find(|p| p.status == PaymentStatus::Success)
    }
}

// Command methods (return events)
impl Invoice {
    /// Opens the invoice for a booking.
    pub fn open(
        &self,
        invoice_id: AggregateId,
        booking_id: AggregateId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.id.is_some() {
            return Err(InvoiceError::AlreadyOpened);
        }

        Ok(vec![InvoiceEvent::InvoiceOpened(InvoiceOpenedData {
            invoice_id,
            booking_id,
            amount,
            opened_at: now,
        })])
    }

    /// Registers a new gateway payment attempt.
    ///
    /// Only one attempt may be in flight at a time; a failed attempt can be
    /// followed by a fresh one.
    pub fn register_payment(
        &self,
        payment_id: Uuid,
        transaction_ref: String,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.id.is_none() {
            return Err(InvoiceError::NotOpened);
        }
        if !self.status.is_pending() {
            return Err(InvoiceError::InvalidStatus {
                status: self.status,
                action: "register payment",
            });
        }
        if self.pending_payment().is_some() {
            return Err(InvoiceError::PaymentInFlight);
        }

        Ok(vec![InvoiceEvent::PaymentRegistered(
            PaymentRegisteredData {
                payment_id,
                transaction_ref,
                amount,
                registered_at: now,
            },
        )])
    }

    /// Marks a payment attempt succeeded, which settles the invoice.
    pub fn mark_paid(
        &self,
        payment_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.id.is_none() {
            return Err(InvoiceError::NotOpened);
        }
        if !self.status.is_pending() {
            return Err(InvoiceError::InvalidStatus {
                status: self.status,
                action: "mark paid",
            });
        }

        let payment = self
            .payments
            .get(&payment_id)
            .ok_or(InvoiceError::UnknownPayment { payment_id })?;
        if payment.status != PaymentStatus::Pending {
            return Err(InvoiceError::PaymentStatusConflict {
                payment_id,
                status: payment.status,
                expected: PaymentStatus::Pending,
            });
        }

        Ok(vec![InvoiceEvent::PaymentSucceeded(PaymentSucceededData {
            payment_id,
            paid_at,
        })])
    }

    /// Marks a payment attempt failed; the invoice stays pending.
    ///
    /// A repeated failure callback for an already-failed attempt is a
    /// no-op, matching the gateway's at-least-once delivery.
    pub fn fail_payment(
        &self,
        payment_id: Uuid,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.id.is_none() {
            return Err(InvoiceError::NotOpened);
        }

        let payment = self
            .payments
            .get(&payment_id)
            .ok_or(InvoiceError::UnknownPayment { payment_id })?;

        match payment.status {
            PaymentStatus::Failed => Ok(vec![]),
            PaymentStatus::Success => Err(InvoiceError::PaymentStatusConflict {
                payment_id,
                status: payment.status,
                expected: PaymentStatus::Pending,
            }),
            PaymentStatus::Pending => Ok(vec![InvoiceEvent::PaymentFailed(PaymentFailedData {
                payment_id,
                reason: reason.into(),
                failed_at: now,
            })]),
        }
    }

    /// Fails a pending invoice as part of the expiration cascade.
    ///
    /// No-op unless pending: a paid or already-failed invoice means the
    /// other path finished first.
    pub fn fail_pending(&self, now: DateTime<Utc>) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.id.is_none() {
            return Err(InvoiceError::NotOpened);
        }
        if !self.status.is_pending() {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::InvoiceFailed(InvoiceFailedData {
            failed_at: now,
        })])
    }

    /// Refunds a paid invoice.
    pub fn refund(&self, now: DateTime<Utc>) -> Result<Vec<InvoiceEvent>, InvoiceError> {
        if self.id.is_none() {
            return Err(InvoiceError::NotOpened);
        }
        if !self.status.can_refund() {
            return Err(InvoiceError::InvalidStatus {
                status: self.status,
                action: "refund",
            });
        }

        Ok(vec![InvoiceEvent::InvoiceRefunded(InvoiceRefundedData {
            refunded_at: now,
        })])
    }
}

/// Loads and mutates invoice aggregates against the event store.
///
/// Settlement drives the invoice with its own handler (instead of the
/// domain command handler) so invoice command rejections surface as
/// settlement errors directly.
pub struct InvoiceHandler<S: event_store::EventStore> {
    store: S,
}

impl<S: event_store::EventStore> InvoiceHandler<S> {
    /// Creates a handler over the given event store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an invoice by replaying its events.
    pub async fn load(&self, invoice_id: AggregateId) -> crate::error::Result<Invoice> {
        let events = self.store.events_for_aggregate(invoice_id).await?;

        let mut invoice = Invoice::default();
        for envelope in events {
            let event: InvoiceEvent = serde_json::from_value(envelope.payload)?;
            invoice.apply(event);
            invoice.set_version(envelope.version);
        }

        Ok(invoice)
    }

    /// Loads an invoice, returning None if it doesn't exist.
    pub async fn load_existing(
        &self,
        invoice_id: AggregateId,
    ) -> crate::error::Result<Option<Invoice>> {
        let invoice = self.load(invoice_id).await?;
        if invoice.id().is_some() {
            Ok(Some(invoice))
        } else {
            Ok(None)
        }
    }

    /// Executes a command against an invoice and persists the events under
    /// the expected-version check.
    pub async fn execute<F>(
        &self,
        invoice_id: AggregateId,
        command_fn: F,
    ) -> crate::error::Result<(Invoice, Vec<InvoiceEvent>)>
    where
        F: FnOnce(&Invoice) -> Result<Vec<InvoiceEvent>, InvoiceError>,
    {
        use domain::DomainEvent;
        use event_store::{AppendOptions, EventEnvelope};

        let mut invoice = self.load(invoice_id).await?;
        let current_version = invoice.version();

        let events = command_fn(&invoice)?;

        if events.is_empty() {
            return Ok((invoice, vec![]));
        }

        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;
        for event in &events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(invoice_id)
                .aggregate_type(Invoice::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build();
            envelopes.push(envelope);
        }

        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(envelopes, options).await?;

        for event in &events {
            invoice.apply(event.clone());
        }
        invoice.set_version(new_version);

        Ok((invoice, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened_invoice() -> (Invoice, AggregateId, AggregateId) {
        let mut invoice = Invoice::default();
        let invoice_id = AggregateId::new();
        let booking_id = AggregateId::new();
        let events = invoice
            .open(invoice_id, booking_id, Money::from_minor(180_000), Utc::now())
            .unwrap();
        invoice.apply_events(events);
        (invoice, invoice_id, booking_id)
    }

    fn with_pending_payment() -> (Invoice, Uuid) {
        let (mut invoice, _, _) = opened_invoice();
        let payment_id = Uuid::new_v4();
        let events = invoice
            .register_payment(
                payment_id,
                "TXN-test".to_string(),
                Money::from_minor(180_000),
                Utc::now(),
            )
            .unwrap();
        invoice.apply_events(events);
        (invoice, payment_id)
    }

    #[test]
    fn open_starts_pending() {
        let (invoice, invoice_id, booking_id) = opened_invoice();
        assert_eq!(invoice.id(), Some(invoice_id));
        assert_eq!(invoice.booking_id(), Some(booking_id));
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
    }

    #[test]
    fn open_twice_fails() {
        let (invoice, _, _) = opened_invoice();
        let result = invoice.open(
            AggregateId::new(),
            AggregateId::new(),
            Money::zero(),
            Utc::now(),
        );
        assert!(matches!(result, Err(InvoiceError::AlreadyOpened)));
    }

    #[test]
    fn only_one_payment_in_flight() {
        let (invoice, _) = with_pending_payment();
        let result = invoice.register_payment(
            Uuid::new_v4(),
            "TXN-other".to_string(),
            Money::from_minor(180_000),
            Utc::now(),
        );
        assert!(matches!(result, Err(InvoiceError::PaymentInFlight)));
    }

    #[test]
    fn mark_paid_settles_invoice_and_payment() {
        let (mut invoice, payment_id) = with_pending_payment();
        let events = invoice.mark_paid(payment_id, Utc::now()).unwrap();
        invoice.apply_events(events);

        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(
            invoice.payment(payment_id).unwrap().status,
            PaymentStatus::Success
        );
        assert_eq!(invoice.settled_payment().unwrap().payment_id, payment_id);
    }

    #[test]
    fn mark_paid_twice_is_a_status_conflict() {
        let (mut invoice, payment_id) = with_pending_payment();
        invoice.apply_events(invoice.mark_paid(payment_id, Utc::now()).unwrap());

        let result = invoice.mark_paid(payment_id, Utc::now());
        assert!(matches!(result, Err(InvoiceError::InvalidStatus { .. })));
    }

    #[test]
    fn failed_attempt_leaves_invoice_pending_for_retry() {
        let (mut invoice, payment_id) = with_pending_payment();
        let events = invoice
            .fail_payment(payment_id, "declined", Utc::now())
            .unwrap();
        invoice.apply_events(events);

        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(
            invoice.payment(payment_id).unwrap().status,
            PaymentStatus::Failed
        );

        // Repeated failure callback: no-op.
        let events = invoice
            .fail_payment(payment_id, "declined again", Utc::now())
            .unwrap();
        assert!(events.is_empty());

        // A fresh attempt can be registered now.
        assert!(
            invoice
                .register_payment(
                    Uuid::new_v4(),
                    "TXN-retry".to_string(),
                    Money::from_minor(180_000),
                    Utc::now(),
                )
                .is_ok()
        );
    }

    #[test]
    fn fail_pending_cascades_to_pending_payments() {
        let (mut invoice, payment_id) = with_pending_payment();
        let events = invoice.fail_pending(Utc::now()).unwrap();
        invoice.apply_events(events);

        assert_eq!(invoice.status(), InvoiceStatus::Failed);
        assert_eq!(
            invoice.payment(payment_id).unwrap().status,
            PaymentStatus::Failed
        );
    }

    #[test]
    fn fail_pending_is_noop_once_paid() {
        let (mut invoice, payment_id) = with_pending_payment();
        invoice.apply_events(invoice.mark_paid(payment_id, Utc::now()).unwrap());

        let events = invoice.fail_pending(Utc::now()).unwrap();
        assert!(events.is_empty());
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn refund_requires_paid() {
        let (mut invoice, payment_id) = with_pending_payment();

        let result = invoice.refund(Utc::now());
        assert!(matches!(result, Err(InvoiceError::InvalidStatus { .. })));

        invoice.apply_events(invoice.mark_paid(payment_id, Utc::now()).unwrap());
        invoice.apply_events(invoice.refund(Utc::now()).unwrap());
        assert_eq!(invoice.status(), InvoiceStatus::Refunded);
    }
}
