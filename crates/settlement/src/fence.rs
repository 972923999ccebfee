//! The idempotency fence for settlement effects.
//!
//! Before any effect is applied for a payment, a processing-log entry keyed
//! by the payment id is claimed; a duplicate claim means the effects were
//! already (or are being) applied and the caller must no-op. Both postings
//! and reversals are fenced — refunds share the mechanism so an admin retry
//! cannot double-reverse revenue or points.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Which settlement effect a fence entry guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementKind {
    /// Posting of a successful payment.
    Posting,
    /// Reversal of a refunded payment.
    Reversal,
}

/// Uniqueness-guarded processing log.
///
/// Implementations must make `claim` atomic: of two concurrent claims for
/// the same key, exactly one returns true.
#[async_trait]
pub trait ProcessingLog: Send + Sync {
    /// Claims the fence entry. Returns false if it was already claimed.
    async fn claim(&self, payment_id: Uuid, kind: SettlementKind) -> Result<bool>;

    /// Releases a claim after a failed settlement so a retry can proceed.
    async fn release(&self, payment_id: Uuid, kind: SettlementKind) -> Result<()>;

    /// Returns true if the entry is currently claimed.
    async fn is_claimed(&self, payment_id: Uuid, kind: SettlementKind) -> Result<bool>;
}

/// In-memory processing log for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessingLog {
    entries: Arc<RwLock<HashSet<(Uuid, SettlementKind)>>>,
}

impl InMemoryProcessingLog {
    /// Creates a new empty processing log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of claimed entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if no entries are claimed.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

#[async_trait]
impl ProcessingLog for InMemoryProcessingLog {
    async fn claim(&self, payment_id: Uuid, kind: SettlementKind) -> Result<bool> {
        // Insert-if-absent under one write lock: the uniqueness constraint.
        Ok(self.entries.write().unwrap().insert((payment_id, kind)))
    }

    async fn release(&self, payment_id: Uuid, kind: SettlementKind) -> Result<()> {
        self.entries.write().unwrap().remove(&(payment_id, kind));
        Ok(())
    }

    async fn is_claimed(&self, payment_id: Uuid, kind: SettlementKind) -> Result<bool> {
        Ok(self.entries.read().unwrap().contains(&(payment_id, kind)))
    }
}
