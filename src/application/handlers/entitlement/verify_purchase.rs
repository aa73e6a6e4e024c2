//! VerifyPurchaseHandler - Client-initiated purchase verification.
//!
//! Verifies a purchase token with the billing oracle and grants premium to
//! the caller. Each provider order is granted at most once: the ledger entry
//! and the entitlement write commit together, and a replay of the same order
//! returns the existing grant instead of writing again.

use std::sync::Arc;

use crate::domain::entitlement::{
    CommitResult, EntitlementTier, Platform, ProcessedOrder, PurchaseSnapshot,
    SubscriptionStatus, SubscriptionUpdate, VerificationError,
};
use crate::domain::foundation::{OrderId, ProductId, PurchaseToken, Timestamp, UserId};
use crate::ports::{BillingOracle, OracleError, ProcessedOrderRepository, SubscriptionRepository};

/// Command to verify a purchase for the signed-in caller.
#[derive(Debug, Clone)]
pub struct VerifyPurchaseCommand {
    /// Authenticated caller, `None` when the request carried no identity.
    pub caller: Option<UserId>,
    pub uid: String,
    pub product_id: String,
    pub purchase_token: String,
    pub platform: String,
}

/// Verification result returned to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyPurchaseResult {
    pub valid: bool,
    pub order_id: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub auto_renewing: Option<bool>,
    pub price_amount_micros: Option<i64>,
    pub price_currency_code: Option<String>,
    pub error: Option<String>,
    pub already_processed: bool,
}

impl VerifyPurchaseResult {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    fn granted(order_id: &OrderId, purchase: &PurchaseSnapshot) -> Self {
        Self {
            valid: true,
            order_id: Some(order_id.to_string()),
            expires_at: purchase.expires_at,
            auto_renewing: Some(purchase.auto_renewing),
            price_amount_micros: purchase.price_amount_micros,
            price_currency_code: purchase.price_currency_code.clone(),
            ..Default::default()
        }
    }
}

pub struct VerifyPurchaseHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    orders: Arc<dyn ProcessedOrderRepository>,
    oracle: Arc<dyn BillingOracle>,
}

impl VerifyPurchaseHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        orders: Arc<dyn ProcessedOrderRepository>,
        oracle: Arc<dyn BillingOracle>,
    ) -> Self {
        Self {
            subscriptions,
            orders,
            oracle,
        }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPurchaseCommand,
    ) -> Result<VerifyPurchaseResult, VerificationError> {
        // 1. Authentication and argument checks
        let caller = cmd.caller.ok_or(VerificationError::Unauthenticated)?;
        let uid = UserId::new(cmd.uid)?;
        let product_id = ProductId::new(cmd.product_id)?;
        let token = PurchaseToken::new(cmd.purchase_token)?;

        if caller != uid {
            tracing::warn!(caller = %caller, uid = %uid, "Verification requested for another user");
            return Err(VerificationError::PermissionDenied);
        }

        let platform: Platform = cmd
            .platform
            .parse()
            .map_err(|_| VerificationError::Unimplemented(cmd.platform.clone()))?;
        if platform != Platform::Android {
            return Err(VerificationError::Unimplemented(cmd.platform));
        }

        // 2. Authoritative purchase state
        let purchase = match self.oracle.get_subscription(&product_id, &token).await {
            Ok(purchase) => purchase,
            Err(e) => return rejection_for(e, &uid, &token),
        };

        if !purchase.is_paid() {
            tracing::info!(
                uid = %uid,
                payment_state = ?purchase.payment_state,
                "Purchase payment not completed"
            );
            return Ok(VerifyPurchaseResult::rejected(
                "payment not completed or pending",
            ));
        }

        let order_id = purchase
            .order_id
            .clone()
            .map(OrderId::new)
            .transpose()?
            .ok_or_else(|| VerificationError::internal("billing API returned no orderId"))?;

        // 3. Replay of an order that was already granted
        if let Some(existing) = self.orders.find_by_order_id(&order_id).await? {
            return self.already_processed(&existing, &uid).await;
        }

        // 4. Ledger entry and entitlement in one commit
        let now = Timestamp::now();
        let order = ProcessedOrder::new(
            order_id.clone(),
            uid.clone(),
            product_id.clone(),
            purchase.expires_at,
            now,
        );
        let update = SubscriptionUpdate::new(now)
            .tier(EntitlementTier::Premium)
            .status(SubscriptionStatus::Active)
            .product_id(product_id)
            .purchase_token(token)
            .order_id(order_id.clone())
            .platform(Platform::Android)
            .auto_renewing(purchase.auto_renewing)
            .expires_at(purchase.expires_at)
            .price(
                purchase.price_amount_micros,
                purchase.price_currency_code.clone(),
            )
            .verified_at(now);

        match self.orders.commit_activation(&order, &update).await? {
            CommitResult::Committed => {
                tracing::info!(
                    uid = %uid,
                    order_id = %order_id,
                    expires_at = ?purchase.expires_at,
                    "Purchase verified, premium granted"
                );
                Ok(VerifyPurchaseResult::granted(&order_id, &purchase))
            }
            CommitResult::AlreadyClaimed(existing) => self.already_processed(&existing, &uid).await,
        }
    }

    async fn already_processed(
        &self,
        existing: &ProcessedOrder,
        uid: &UserId,
    ) -> Result<VerifyPurchaseResult, VerificationError> {
        if !existing.belongs_to(uid) {
            tracing::warn!(
                order_id = %existing.order_id,
                uid = %uid,
                owner = %existing.uid,
                "Order already granted to another user"
            );
            return Err(VerificationError::AlreadyExists);
        }

        let current = self.subscriptions.find_by_user_id(uid).await?;
        tracing::info!(uid = %uid, order_id = %existing.order_id, "Order already processed");

        Ok(VerifyPurchaseResult {
            valid: true,
            order_id: Some(existing.order_id.to_string()),
            expires_at: current
                .as_ref()
                .and_then(|record| record.expires_at)
                .or(existing.expires_at),
            auto_renewing: current.as_ref().map(|record| record.auto_renewing),
            already_processed: true,
            ..Default::default()
        })
    }
}

/// Client-visible rejection for oracle failures the client can act on;
/// anything else is internal.
fn rejection_for(
    error: OracleError,
    uid: &UserId,
    token: &PurchaseToken,
) -> Result<VerifyPurchaseResult, VerificationError> {
    let message = match &error {
        OracleError::NotFound => "purchase not found",
        OracleError::Unauthorized(_) => "billing API authentication failure",
        OracleError::Forbidden(_) => "insufficient permissions on the service account",
        OracleError::Gone => "purchase canceled or expired",
        OracleError::CredentialsUnavailable(_) => "service-account key file missing",
        _ => {
            tracing::error!(uid = %uid, token_prefix = token.prefix(20), error = %error, "Billing oracle failed");
            return Err(VerificationError::internal(error.to_string()));
        }
    };

    tracing::warn!(uid = %uid, token_prefix = token.prefix(20), error = %error, "Purchase rejected");
    Ok(VerifyPurchaseResult::rejected(message))
}
