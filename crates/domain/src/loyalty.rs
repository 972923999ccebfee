//! Loyalty/customer service boundary.
//!
//! Point balances live in the customer service. Redemption reads the
//! balance before committing a discount; crediting after settlement is
//! best-effort and must never roll back a settled booking.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CustomerId;
use thiserror::Error;

/// Errors from the loyalty boundary.
#[derive(Debug, Error)]
pub enum LoyaltyError {
    /// The customer is unknown to the loyalty service.
    #[error("Unknown customer: {0}")]
    UnknownCustomer(CustomerId),

    /// The loyalty service could not be reached or failed.
    #[error("Loyalty service unavailable: {0}")]
    Unavailable(String),
}

/// Loyalty point operations exposed by the customer service.
#[async_trait]
pub trait LoyaltyService: Send + Sync {
    /// Returns the customer's current point balance.
    async fn point_balance(&self, customer: CustomerId) -> Result<i64, LoyaltyError>;

    /// Adjusts the customer's balance by a signed delta.
    async fn adjust_points(&self, customer: CustomerId, delta: i64) -> Result<(), LoyaltyError>;
}

#[derive(Debug, Default)]
struct LoyaltyState {
    balances: HashMap<CustomerId, i64>,
    fail_on_adjust: bool,
}

/// In-memory loyalty service for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoyaltyService {
    state: Arc<RwLock<LoyaltyState>>,
}

impl InMemoryLoyaltyService {
    /// Creates a new in-memory loyalty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a customer balance.
    pub fn set_balance(&self, customer: CustomerId, points: i64) {
        self.state.write().unwrap().balances.insert(customer, points);
    }

    /// Configures the service to fail adjustment calls.
    pub fn set_fail_on_adjust(&self, fail: bool) {
        self.state.write().unwrap().fail_on_adjust = fail;
    }

    /// Returns the current balance, if the customer is known.
    pub fn balance(&self, customer: CustomerId) -> Option<i64> {
        self.state.read().unwrap().balances.get(&customer).copied()
    }
}

#[async_trait]
impl LoyaltyService for InMemoryLoyaltyService {
    async fn point_balance(&self, customer: CustomerId) -> Result<i64, LoyaltyError> {
        self.state
            .read()
            .unwrap()
            .balances
            .get(&customer)
            .copied()
            .ok_or(LoyaltyError::UnknownCustomer(customer))
    }

    async fn adjust_points(&self, customer: CustomerId, delta: i64) -> Result<(), LoyaltyError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_adjust {
            return Err(LoyaltyError::Unavailable("adjustment rejected".to_string()));
        }

        let balance = state.balances.entry(customer).or_insert(0);
        *balance += delta;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn balance_and_adjust() {
        let service = InMemoryLoyaltyService::new();
        let customer = CustomerId::new();
        service.set_balance(customer, 100);

        assert_eq!(service.point_balance(customer).await.unwrap(), 100);

        service.adjust_points(customer, -30).await.unwrap();
        assert_eq!(service.point_balance(customer).await.unwrap(), 70);

        service.adjust_points(customer, 5).await.unwrap();
        assert_eq!(service.point_balance(customer).await.unwrap(), 75);
    }

    #[tokio::test]
    async fn unknown_customer_has_no_balance() {
        let service = InMemoryLoyaltyService::new();
        let result = service.point_balance(CustomerId::new()).await;
        assert!(matches!(result, Err(LoyaltyError::UnknownCustomer(_))));
    }

    #[tokio::test]
    async fn adjust_failure_is_surfaced() {
        let service = InMemoryLoyaltyService::new();
        let customer = CustomerId::new();
        service.set_balance(customer, 10);
        service.set_fail_on_adjust(true);

        let result = service.adjust_points(customer, 5).await;
        assert!(matches!(result, Err(LoyaltyError::Unavailable(_))));
        assert_eq!(service.balance(customer), Some(10));
    }
}
