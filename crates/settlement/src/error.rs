//! Settlement error types.

use common::AggregateId;
use domain::DomainError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::state::{InvoiceStatus, PaymentStatus};

/// Errors raised by invoice commands.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// The invoice was already opened.
    #[error("Invoice already opened")]
    AlreadyOpened,

    /// The invoice does not exist yet.
    #[error("Invoice not opened")]
    NotOpened,

    /// The operation is not legal for the invoice's current status.
    #[error("Invalid invoice status: cannot {action} while {status}")]
    InvalidStatus {
        status: InvoiceStatus,
        action: &'static str,
    },

    /// The referenced payment attempt does not exist on this invoice.
    #[error("Unknown payment: {payment_id}")]
    UnknownPayment { payment_id: uuid::Uuid },

    /// The payment attempt is not in the required status.
    #[error("Payment {payment_id} is {status}, expected {expected}")]
    PaymentStatusConflict {
        payment_id: uuid::Uuid,
        status: PaymentStatus,
        expected: PaymentStatus,
    },

    /// A pending payment attempt already exists.
    #[error("A payment attempt is already in flight")]
    PaymentInFlight,
}

/// Errors that can occur during settlement operations.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// A domain operation failed.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// An invoice command was rejected.
    #[error("Invoice error: {0}")]
    Invoice(InvoiceError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Projection error while refreshing an index.
    #[error("Projection error: {0}")]
    Projection(#[from] projections::ProjectionError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The provider callback signature did not verify.
    #[error("Callback signature rejected")]
    SignatureRejected,

    /// The transaction reference could not be parsed.
    #[error("Malformed transaction reference: {0}")]
    BadReference(String),

    /// The booking does not exist.
    #[error("Booking not found: {0}")]
    BookingNotFound(AggregateId),

    /// The booking cannot start or complete a payment in its state.
    #[error("Booking not payable: {0}")]
    BookingNotPayable(String),

    /// The booking's hold lapsed before the payment settled.
    ///
    /// Distinct from a generic conflict so clients can render "booking
    /// expired" specifically.
    #[error("Booking expired before settlement")]
    BookingExpired,

    /// No invoice exists for the booking.
    #[error("No invoice for booking {0}")]
    InvoiceNotFound(AggregateId),

    /// Refund requested for a booking without a settled payment.
    #[error("Nothing to refund for booking {0}")]
    NothingToRefund(AggregateId),

    /// Notification delivery failed (downstream-degraded, never fatal).
    #[error("Notification delivery failed: {0}")]
    Notification(String),
}

impl From<InvoiceError> for SettlementError {
    fn from(e: InvoiceError) -> Self {
        SettlementError::Invoice(e)
    }
}

/// Result type for settlement operations.
pub type Result<T> = std::result::Result<T, SettlementError>;
