//! Authoritative purchase state as reported by the billing provider.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Provider payment state of the current subscription period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PaymentState {
    Pending,
    Received,
    FreeTrial,
    Deferred,
    Unknown(i32),
}

impl PaymentState {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PaymentState::Pending,
            1 => PaymentState::Received,
            2 => PaymentState::FreeTrial,
            3 => PaymentState::Deferred,
            other => PaymentState::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PaymentState::Pending => 0,
            PaymentState::Received => 1,
            PaymentState::FreeTrial => 2,
            PaymentState::Deferred => 3,
            PaymentState::Unknown(code) => *code,
        }
    }

    /// Only received payments and free trials grant an entitlement.
    pub fn grants_entitlement(&self) -> bool {
        matches!(self, PaymentState::Received | PaymentState::FreeTrial)
    }
}

impl From<i32> for PaymentState {
    fn from(code: i32) -> Self {
        PaymentState::from_code(code)
    }
}

impl From<PaymentState> for i32 {
    fn from(state: PaymentState) -> Self {
        state.code()
    }
}

/// Subscription purchase as returned by the billing oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseSnapshot {
    pub order_id: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub auto_renewing: bool,
    /// Absent for expired or canceled purchases.
    pub payment_state: Option<PaymentState>,
    pub price_amount_micros: Option<i64>,
    pub price_currency_code: Option<String>,
}

impl PurchaseSnapshot {
    pub fn is_paid(&self) -> bool {
        self.payment_state
            .map(|state| state.grants_entitlement())
            .unwrap_or(false)
    }

    /// Whether the paid period is still running at `now`.
    pub fn is_unexpired_at(&self, now: &Timestamp) -> bool {
        self.expires_at
            .map(|expires_at| expires_at.is_after(now))
            .unwrap_or(false)
    }
}
