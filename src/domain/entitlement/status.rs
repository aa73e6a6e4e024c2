//! Subscription lifecycle status as last reported by the billing provider.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Lifecycle status stored alongside the entitlement tier.
///
/// The provider is the source of truth for transitions, so any status may
/// follow any other; ordering is enforced by event time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and renewing (or verified).
    Active,

    /// Renewal payment failed; the provider is retrying and access continues.
    GracePeriod,

    /// Retry window exhausted; access suspended until recovery.
    OnHold,

    /// User paused the subscription.
    Paused,

    /// Auto-renew turned off; access runs until the paid period ends.
    Canceled,

    /// Period ended without renewal.
    Expired,

    /// Refunded or revoked by the provider.
    Revoked,
}

impl SubscriptionStatus {
    /// Statuses under which a premium tier is consistent.
    pub fn permits_premium(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::GracePeriod | SubscriptionStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::GracePeriod => "grace_period",
            SubscriptionStatus::OnHold => "on_hold",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Revoked => "revoked",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "active" => SubscriptionStatus::Active,
            "grace_period" => SubscriptionStatus::GracePeriod,
            "on_hold" => SubscriptionStatus::OnHold,
            "paused" => SubscriptionStatus::Paused,
            "canceled" => SubscriptionStatus::Canceled,
            "expired" => SubscriptionStatus::Expired,
            "revoked" => SubscriptionStatus::Revoked,
            other => {
                return Err(ValidationError::invalid_format(
                    "status",
                    format!("unknown status '{}'", other),
                ))
            }
        };
        Ok(status)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
