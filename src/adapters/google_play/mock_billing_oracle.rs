//! Mock billing oracle for testing.
//!
//! Purchases are registered per purchase token. Unregistered tokens fall back
//! to the default snapshot, or `NotFound` when none is set.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::entitlement::{PaymentState, PurchaseSnapshot};
use crate::domain::foundation::{ProductId, PurchaseToken, Timestamp};
use crate::ports::{BillingOracle, OracleError};

#[derive(Default, Clone)]
pub struct MockBillingOracle {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    purchases: HashMap<String, PurchaseSnapshot>,
    default_purchase: Option<PurchaseSnapshot>,
    /// Returned once, on the next call.
    next_error: Option<OracleError>,
    /// Returned on every call until cleared.
    error: Option<OracleError>,
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockBillingOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A paid, auto-renewing purchase expiring at `expires_at`.
    pub fn paid(order_id: &str, expires_at: Timestamp) -> PurchaseSnapshot {
        PurchaseSnapshot {
            order_id: Some(order_id.to_string()),
            expires_at: Some(expires_at),
            auto_renewing: true,
            payment_state: Some(PaymentState::Received),
            price_amount_micros: Some(4_990_000),
            price_currency_code: Some("USD".to_string()),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_purchase(&self, token: &str, snapshot: PurchaseSnapshot) {
        self.inner
            .lock()
            .unwrap()
            .purchases
            .insert(token.to_string(), snapshot);
    }

    pub fn set_default_purchase(&self, snapshot: PurchaseSnapshot) {
        self.inner.lock().unwrap().default_purchase = Some(snapshot);
    }

    /// Fail the next call only.
    pub fn set_next_error(&self, error: OracleError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Fail every call until [`clear_errors`](Self::clear_errors).
    pub fn set_error(&self, error: OracleError) {
        self.inner.lock().unwrap().error = Some(error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.error = None;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().call_log.len()
    }
}

#[async_trait]
impl BillingOracle for MockBillingOracle {
    async fn get_subscription(
        &self,
        product_id: &ProductId,
        token: &PurchaseToken,
    ) -> Result<PurchaseSnapshot, OracleError> {
        let mut state = self.inner.lock().unwrap();
        state.call_log.push(MethodCall {
            method: "get_subscription".to_string(),
            args: vec![product_id.to_string(), token.to_string()],
        });

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        if let Some(error) = state.error.clone() {
            return Err(error);
        }

        state
            .purchases
            .get(token.as_str())
            .or(state.default_purchase.as_ref())
            .cloned()
            .ok_or(OracleError::NotFound)
    }
}
