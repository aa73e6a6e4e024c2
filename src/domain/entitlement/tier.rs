//! Entitlement tier.
//!
//! The tier is the only field downstream feature gates read.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Feature entitlement granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementTier {
    /// No paid features.
    #[default]
    Free,

    /// Paid features unlocked.
    Premium,
}

impl EntitlementTier {
    pub fn is_premium(&self) -> bool {
        matches!(self, EntitlementTier::Premium)
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementTier::Free => "free",
            EntitlementTier::Premium => "premium",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntitlementTier::Free => "Free",
            EntitlementTier::Premium => "Premium",
        }
    }
}

impl FromStr for EntitlementTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(EntitlementTier::Free),
            "premium" => Ok(EntitlementTier::Premium),
            other => Err(ValidationError::invalid_format(
                "tier",
                format!("unknown tier '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for EntitlementTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
