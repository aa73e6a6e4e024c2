//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, rejecting empty input.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Application user identifier, the key of a subscription record.
    UserId,
    "uid"
);

string_id!(
    /// Billing provider order identifier, the key of the processed-order ledger.
    OrderId,
    "orderId"
);

string_id!(
    /// Store product (subscription SKU) identifier.
    ProductId,
    "productId"
);

string_id!(
    /// Opaque purchase token issued by the billing provider.
    PurchaseToken,
    "purchaseToken"
);

impl PurchaseToken {
    /// First `len` characters of the token, for logs.
    pub fn prefix(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Redacted form stored in the notification audit log.
    pub fn redacted(&self) -> String {
        format!("{}...", self.prefix(30))
    }
}
