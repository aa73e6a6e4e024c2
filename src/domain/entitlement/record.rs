//! Subscription record and merge-patch updates.
//!
//! Every writer (notification handlers, purchase verification, the expiry
//! sweep) expresses its change as a [`SubscriptionUpdate`]. Fields left unset
//! in the patch keep their stored value.

use serde::{Deserialize, Serialize};

use super::{EntitlementTier, NotificationType, Platform, SubscriptionStatus};
use crate::domain::foundation::{OrderId, ProductId, PurchaseToken, Timestamp, UserId};

/// Per-user entitlement state, keyed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub tier: EntitlementTier,
    pub status: Option<SubscriptionStatus>,
    pub product_id: Option<ProductId>,
    pub purchase_token: Option<PurchaseToken>,
    pub order_id: Option<OrderId>,
    pub platform: Option<Platform>,
    pub auto_renewing: bool,
    /// `None` means the record never lapses for sweep purposes.
    pub expires_at: Option<Timestamp>,
    pub price_amount_micros: Option<i64>,
    pub price_currency_code: Option<String>,
    pub last_notification_type: Option<NotificationType>,
    /// Event time of the newest lifecycle notification applied.
    pub last_event_at: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub expired_at: Option<Timestamp>,
    pub hold_started_at: Option<Timestamp>,
    pub verified_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// A blank free-tier record.
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            tier: EntitlementTier::Free,
            status: None,
            product_id: None,
            purchase_token: None,
            order_id: None,
            platform: None,
            auto_renewing: false,
            expires_at: None,
            price_amount_micros: None,
            price_currency_code: None,
            last_notification_type: None,
            last_event_at: None,
            canceled_at: None,
            expired_at: None,
            hold_started_at: None,
            verified_at: None,
            updated_at: now,
        }
    }

    /// Premium with an expiry in the past: the sweep predicate.
    pub fn is_lapsed(&self, now: &Timestamp) -> bool {
        self.tier.is_premium()
            && self
                .expires_at
                .map(|expires_at| expires_at.is_before(now))
                .unwrap_or(false)
    }

    /// Merges `update` into this record.
    pub fn apply(&mut self, update: &SubscriptionUpdate) {
        if let Some(tier) = update.tier {
            self.tier = tier;
        }
        if let Some(status) = update.status {
            self.status = Some(status);
        }
        if let Some(product_id) = &update.product_id {
            self.product_id = Some(product_id.clone());
        }
        if let Some(token) = &update.purchase_token {
            self.purchase_token = Some(token.clone());
        }
        if let Some(order_id) = &update.order_id {
            self.order_id = Some(order_id.clone());
        }
        if let Some(platform) = update.platform {
            self.platform = Some(platform);
        }
        if let Some(auto_renewing) = update.auto_renewing {
            self.auto_renewing = auto_renewing;
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(micros) = update.price_amount_micros {
            self.price_amount_micros = Some(micros);
        }
        if let Some(currency) = &update.price_currency_code {
            self.price_currency_code = Some(currency.clone());
        }
        if let Some(kind) = update.notification_type {
            self.last_notification_type = Some(kind);
        }
        if let Some(event_at) = update.event_at {
            self.last_event_at = Some(event_at);
        }
        if let Some(at) = update.canceled_at {
            self.canceled_at = Some(at);
        }
        if let Some(at) = update.expired_at {
            self.expired_at = Some(at);
        }
        if let Some(at) = update.hold_started_at {
            self.hold_started_at = Some(at);
        }
        if let Some(at) = update.verified_at {
            self.verified_at = Some(at);
        }
        self.updated_at = update.updated_at;
    }
}

/// Merge patch for a [`SubscriptionRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub tier: Option<EntitlementTier>,
    pub status: Option<SubscriptionStatus>,
    pub product_id: Option<ProductId>,
    pub purchase_token: Option<PurchaseToken>,
    pub order_id: Option<OrderId>,
    pub platform: Option<Platform>,
    pub auto_renewing: Option<bool>,
    /// `Some(None)` clears the stored expiry.
    pub expires_at: Option<Option<Timestamp>>,
    pub price_amount_micros: Option<i64>,
    pub price_currency_code: Option<String>,
    pub notification_type: Option<NotificationType>,
    /// Provider event time; when set the update is ordered against
    /// `last_event_at` and dropped if older.
    pub event_at: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub expired_at: Option<Timestamp>,
    pub hold_started_at: Option<Timestamp>,
    pub verified_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl SubscriptionUpdate {
    /// Empty patch stamped with `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            tier: None,
            status: None,
            product_id: None,
            purchase_token: None,
            order_id: None,
            platform: None,
            auto_renewing: None,
            expires_at: None,
            price_amount_micros: None,
            price_currency_code: None,
            notification_type: None,
            event_at: None,
            canceled_at: None,
            expired_at: None,
            hold_started_at: None,
            verified_at: None,
            updated_at: now,
        }
    }

    pub fn tier(mut self, tier: EntitlementTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn product_id(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn purchase_token(mut self, token: PurchaseToken) -> Self {
        self.purchase_token = Some(token);
        self
    }

    pub fn order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn auto_renewing(mut self, auto_renewing: bool) -> Self {
        self.auto_renewing = Some(auto_renewing);
        self
    }

    /// Overwrites the expiry, clearing it when `None`.
    pub fn expires_at(mut self, expires_at: Option<Timestamp>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn price(mut self, amount_micros: Option<i64>, currency_code: Option<String>) -> Self {
        self.price_amount_micros = amount_micros;
        self.price_currency_code = currency_code;
        self
    }

    /// Tags the patch with the lifecycle event that produced it.
    pub fn from_notification(mut self, kind: NotificationType, event_at: Option<Timestamp>) -> Self {
        self.notification_type = Some(kind);
        self.event_at = event_at;
        self
    }

    pub fn canceled_at(mut self, at: Timestamp) -> Self {
        self.canceled_at = Some(at);
        self
    }

    pub fn expired_at(mut self, at: Timestamp) -> Self {
        self.expired_at = Some(at);
        self
    }

    pub fn hold_started_at(mut self, at: Timestamp) -> Self {
        self.hold_started_at = Some(at);
        self
    }

    pub fn verified_at(mut self, at: Timestamp) -> Self {
        self.verified_at = Some(at);
        self
    }

    /// True when a newer lifecycle event has already been applied to `current`.
    ///
    /// Equal event times are not stale, so redelivery of the same event
    /// re-applies idempotently.
    pub fn is_stale_for(&self, current: Option<&SubscriptionRecord>) -> bool {
        match (self.event_at, current.and_then(|record| record.last_event_at)) {
            (Some(incoming), Some(applied)) => incoming.is_before(&applied),
            _ => false,
        }
    }

    /// Record produced by applying this patch to a blank record.
    pub fn into_record(&self, user_id: UserId) -> SubscriptionRecord {
        let mut record = SubscriptionRecord::new(user_id, self.updated_at);
        record.apply(self);
        record
    }
}

/// Result of applying an update through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer lifecycle event was already applied; nothing was written.
    Stale,
}
