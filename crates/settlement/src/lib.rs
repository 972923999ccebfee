//! Settlement: the money-side of the engine.
//!
//! Converts confirmed/refunded payments into booking transitions, ticket
//! issuance, loyalty deltas and ledger postings — exactly once per payment,
//! despite the gateway's at-least-once callback delivery. Also hosts the
//! background sweepers that reclaim lapsed holds and age out tickets.

pub mod coordinator;
pub mod directory;
pub mod error;
pub mod events;
pub mod fence;
pub mod gateway;
pub mod invoice;
pub mod services;
pub mod state;
pub mod sweeper;

pub use coordinator::{
    CheckoutSession, RefundOutcome, SettlementCoordinator, SettlementOutcome,
};
pub use directory::InvoiceDirectory;
pub use error::{InvoiceError, Result, SettlementError};
pub use events::{
    InvoiceEvent, InvoiceFailedData, InvoiceOpenedData, InvoiceRefundedData, PaymentFailedData,
    PaymentRegisteredData, PaymentSucceededData,
};
pub use fence::{InMemoryProcessingLog, ProcessingLog, SettlementKind};
pub use gateway::{
    CallbackVerifier, GatewayCallback, GatewayOutcome, SharedSecretVerifier, TransactionRef,
};
pub use invoice::{Invoice, InvoiceHandler, PaymentRecord};
pub use services::{
    BookingRefundedNotice, InMemoryNotifier, Notifier, TicketsIssuedNotice,
};
pub use state::{InvoiceStatus, PaymentStatus};
pub use sweeper::{ExpirationSweeper, SweepReport, TicketSweeper};
