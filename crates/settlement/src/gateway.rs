//! Payment gateway callback boundary.
//!
//! The gateway protocol itself (redirects, field layout, crypto scheme) is
//! the provider's business; this engine sees two callback sinks carrying a
//! transaction reference, an outcome and a signature. Both sinks verify the
//! signature before any state is touched, and both may report the same
//! payment — the settlement fence absorbs the duplicate.

use common::AggregateId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SettlementError;

/// Outcome reported by a gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOutcome {
    Success,
    Failure,
}

impl GatewayOutcome {
    /// Returns the outcome name as used in signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayOutcome::Success => "success",
            GatewayOutcome::Failure => "failure",
        }
    }
}

/// A verified-at-the-edge gateway callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallback {
    pub transaction_ref: String,
    pub outcome: GatewayOutcome,
    pub signature: String,
}

/// Verifies gateway callback signatures before any state mutation.
pub trait CallbackVerifier: Send + Sync {
    /// Checks the callback's signature; error means reject the callback.
    fn verify(&self, callback: &GatewayCallback) -> Result<(), SettlementError>;
}

/// Shared-secret verifier standing in for the provider's signature scheme.
///
/// The signature binds reference and outcome to a secret the provider
/// shares with us; a real provider's scheme plugs in behind the trait.
#[derive(Debug, Clone)]
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    /// Creates a verifier over a shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs a (reference, outcome) pair; used by tests and the dev stub.
    pub fn sign(&self, transaction_ref: &str, outcome: GatewayOutcome) -> String {
        format!("{}.{}.{}", transaction_ref, outcome.as_str(), self.secret)
    }
}

impl CallbackVerifier for SharedSecretVerifier {
    fn verify(&self, callback: &GatewayCallback) -> Result<(), SettlementError> {
        let expected = self.sign(&callback.transaction_ref, callback.outcome);
        if callback.signature == expected {
            Ok(())
        } else {
            metrics::counter!("gateway_signature_rejections_total").increment(1);
            Err(SettlementError::SignatureRejected)
        }
    }
}

/// Parsed transaction reference: `TXN-<invoice>-<payment>`.
///
/// The reference is minted at checkout and embeds both ids, so callbacks
/// resolve without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRef {
    pub invoice_id: AggregateId,
    pub payment_id: Uuid,
}

impl TransactionRef {
    /// Creates a reference for a payment attempt.
    pub fn new(invoice_id: AggregateId, payment_id: Uuid) -> Self {
        Self {
            invoice_id,
            payment_id,
        }
    }

    /// Parses a reference string.
    pub fn parse(raw: &str) -> Result<Self, SettlementError> {
        let rest = raw
            .strip_prefix("TXN-")
            .ok_or_else(|| SettlementError::BadReference(raw.to_string()))?;

        let (invoice_part, payment_part) = rest
            .split_once('-')
            .ok_or_else(|| SettlementError::BadReference(raw.to_string()))?;

        let invoice_uuid = Uuid::parse_str(invoice_part)
            .map_err(|_| SettlementError::BadReference(raw.to_string()))?;
        let payment_id = Uuid::parse_str(payment_part)
            .map_err(|_| SettlementError::BadReference(raw.to_string()))?;

        Ok(Self {
            invoice_id: AggregateId::from_uuid(invoice_uuid),
            payment_id,
        })
    }
}

impl std::fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TXN-{}-{}",
            self.invoice_id.as_uuid().simple(),
            self.payment_id.simple()
        )
    }
}
