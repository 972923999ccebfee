//! Invoice and payment status machines.

use serde::{Deserialize, Serialize};

/// Invoice lifecycle.
///
/// ```text
/// Pending ──┬──► Paid ──► Refunded
///           └──► Failed
/// ```
///
/// `Failed` is reached only through the expiration cascade; a failed
/// payment attempt leaves the invoice `Pending` for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl InvoiceStatus {
    /// Returns true if payment attempts may be registered or settled.
    pub fn is_pending(&self) -> bool {
        matches!(self, InvoiceStatus::Pending)
    }

    /// Returns true if the invoice can be refunded.
    pub fn can_refund(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Failed => "Failed",
            InvoiceStatus::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One gateway transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
