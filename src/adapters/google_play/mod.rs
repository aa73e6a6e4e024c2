//! Google Play billing adapter.
//!
//! - `GooglePlayBillingOracle` - `BillingOracle` over the Play Developer API
//! - `ServiceAccountTokenSource` - OAuth access tokens from a service-account key
//! - `MockBillingOracle` - Configurable oracle for tests

mod api_types;
mod credentials;
mod mock_billing_oracle;
mod play_billing_adapter;

pub use credentials::{AccessTokenSource, ServiceAccountTokenSource, StaticTokenSource};
pub use mock_billing_oracle::{MethodCall, MockBillingOracle};
pub use play_billing_adapter::{GooglePlayBillingOracle, PlayBillingConfig};
