//! Invoice domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{DomainEvent, Money};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events that can occur on an invoice aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InvoiceEvent {
    /// Invoice opened for a booking at checkout time.
    InvoiceOpened(InvoiceOpenedData),

    /// A gateway payment attempt was registered.
    PaymentRegistered(PaymentRegisteredData),

    /// The gateway confirmed a payment; the invoice is paid.
    PaymentSucceeded(PaymentSucceededData),

    /// A payment attempt failed; the invoice stays pending.
    PaymentFailed(PaymentFailedData),

    /// The expiration cascade failed the invoice and its pending attempts.
    InvoiceFailed(InvoiceFailedData),

    /// A paid invoice was refunded.
    InvoiceRefunded(InvoiceRefundedData),
}

impl DomainEvent for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceOpened(_) => "InvoiceOpened",
            InvoiceEvent::PaymentRegistered(_) => "PaymentRegistered",
            InvoiceEvent::PaymentSucceeded(_) => "PaymentSucceeded",
            InvoiceEvent::PaymentFailed(_) => "PaymentFailed",
            InvoiceEvent::InvoiceFailed(_) => "InvoiceFailed",
            InvoiceEvent::InvoiceRefunded(_) => "InvoiceRefunded",
        }
    }
}

/// Data for InvoiceOpened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceOpenedData {
    pub invoice_id: AggregateId,
    pub booking_id: AggregateId,
    pub amount: Money,
    pub opened_at: DateTime<Utc>,
}

/// Data for PaymentRegistered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRegisteredData {
    pub payment_id: Uuid,
    pub transaction_ref: String,
    pub amount: Money,
    pub registered_at: DateTime<Utc>,
}

/// Data for PaymentSucceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSucceededData {
    pub payment_id: Uuid,
    pub paid_at: DateTime<Utc>,
}

/// Data for PaymentFailed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedData {
    pub payment_id: Uuid,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Data for InvoiceFailed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceFailedData {
    pub failed_at: DateTime<Utc>,
}

/// Data for InvoiceRefunded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRefundedData {
    pub refunded_at: DateTime<Utc>,
}
