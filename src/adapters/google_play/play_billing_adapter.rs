//! Google Play Developer API billing oracle.
//!
//! Implements `BillingOracle` with `purchases.subscriptions.get`:
//!
//! ```text
//! GET {base}/androidpublisher/v3/applications/{package}/purchases/subscriptions/{product}/tokens/{token}
//! ```
//!
//! Requests carry a bearer token from an [`AccessTokenSource`]. A 401 drops
//! the cached token so the next call re-authenticates.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::api_types::{error_message, SubscriptionPurchase};
use super::credentials::AccessTokenSource;
use crate::config::BillingConfig;
use crate::domain::entitlement::PurchaseSnapshot;
use crate::domain::foundation::{ProductId, PurchaseToken};
use crate::ports::{BillingOracle, OracleError};

/// Developer API endpoint configuration.
#[derive(Debug, Clone)]
pub struct PlayBillingConfig {
    package_name: String,
    api_base_url: String,
}

impl PlayBillingConfig {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            api_base_url: "https://androidpublisher.googleapis.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

impl From<&BillingConfig> for PlayBillingConfig {
    fn from(config: &BillingConfig) -> Self {
        PlayBillingConfig::new(config.package_name.clone()).with_base_url(config.api_base_url.clone())
    }
}

pub struct GooglePlayBillingOracle {
    config: PlayBillingConfig,
    http_client: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GooglePlayBillingOracle {
    pub fn new(
        config: PlayBillingConfig,
        http_client: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            config,
            http_client,
            tokens,
        }
    }

    fn subscription_url(
        &self,
        product_id: &ProductId,
        token: &PurchaseToken,
    ) -> Result<reqwest::Url, OracleError> {
        let mut url = reqwest::Url::parse(&self.config.api_base_url).map_err(|e| {
            OracleError::Transport(format!("invalid API base URL {}: {}", self.config.api_base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                OracleError::Transport(format!("API base URL {} cannot be a base", self.config.api_base_url))
            })?
            .pop_if_empty()
            .extend([
                "androidpublisher",
                "v3",
                "applications",
                self.config.package_name.as_str(),
                "purchases",
                "subscriptions",
                product_id.as_str(),
                "tokens",
                token.as_str(),
            ]);

        Ok(url)
    }
}

#[async_trait]
impl BillingOracle for GooglePlayBillingOracle {
    async fn get_subscription(
        &self,
        product_id: &ProductId,
        token: &PurchaseToken,
    ) -> Result<PurchaseSnapshot, OracleError> {
        let url = self.subscription_url(product_id, token)?;
        let access_token = self.tokens.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, product_id = %product_id, "Play Developer API request failed");
                OracleError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = OracleError::from_status(status.as_u16(), error_message(&body));

            if matches!(error, OracleError::Unauthorized(_)) {
                self.tokens.invalidate().await;
            }
            tracing::warn!(
                status = status.as_u16(),
                product_id = %product_id,
                token_prefix = token.prefix(20),
                error = %error,
                "Play Developer API returned an error"
            );
            return Err(error);
        }

        let purchase: SubscriptionPurchase = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        PurchaseSnapshot::try_from(purchase).map_err(|e| OracleError::InvalidResponse(e.to_string()))
    }
}
