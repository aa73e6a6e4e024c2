//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Merge writes lock the row with `SELECT ... FOR UPDATE`, apply the patch in
//! memory and write the merged row back inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::entitlement::{
    ApplyOutcome, EntitlementTier, NotificationType, Platform, SubscriptionRecord,
    SubscriptionStatus, SubscriptionUpdate,
};
use crate::domain::foundation::{
    DomainError, OrderId, ProductId, PurchaseToken, Timestamp, UserId,
};
use crate::ports::SubscriptionRepository;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription record.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    tier: String,
    status: Option<String>,
    product_id: Option<String>,
    purchase_token: Option<String>,
    order_id: Option<String>,
    platform: Option<String>,
    auto_renewing: bool,
    expires_at: Option<DateTime<Utc>>,
    price_amount_micros: Option<i64>,
    price_currency_code: Option<String>,
    last_notification_type: Option<i32>,
    last_event_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
    hold_started_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, tier, status, product_id, purchase_token, order_id, platform,
           auto_renewing, expires_at, price_amount_micros, price_currency_code,
           last_notification_type, last_event_at, canceled_at, expired_at,
           hold_started_at, verified_at, updated_at
    FROM subscriptions
"#;

fn optional<T, E: std::fmt::Display>(
    field: &str,
    value: Option<String>,
    parse: impl FnOnce(String) -> Result<T, E>,
) -> Result<Option<T>, DomainError> {
    value.map(parse).transpose().map_err(|e| DomainError::corrupt_record(field, e))
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let ts = |dt: Option<DateTime<Utc>>| dt.map(Timestamp::from_datetime);

        Ok(SubscriptionRecord {
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::corrupt_record("user_id", e))?,
            tier: row
                .tier
                .parse::<EntitlementTier>()
                .map_err(|e| DomainError::corrupt_record("tier", e))?,
            status: optional("status", row.status, |s| s.parse::<SubscriptionStatus>())?,
            product_id: optional("product_id", row.product_id, ProductId::new)?,
            purchase_token: optional("purchase_token", row.purchase_token, PurchaseToken::new)?,
            order_id: optional("order_id", row.order_id, OrderId::new)?,
            platform: optional("platform", row.platform, |s| s.parse::<Platform>())?,
            auto_renewing: row.auto_renewing,
            expires_at: ts(row.expires_at),
            price_amount_micros: row.price_amount_micros,
            price_currency_code: row.price_currency_code,
            last_notification_type: row.last_notification_type.map(NotificationType::from_code),
            last_event_at: ts(row.last_event_at),
            canceled_at: ts(row.canceled_at),
            expired_at: ts(row.expired_at),
            hold_started_at: ts(row.hold_started_at),
            verified_at: ts(row.verified_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Merges `update` into the record for `uid` on an open connection.
///
/// Callers run this inside a transaction; the row lock is held until commit.
pub(super) async fn apply_update(
    conn: &mut PgConnection,
    uid: &UserId,
    update: &SubscriptionUpdate,
) -> Result<ApplyOutcome, DomainError> {
    // guarantees a row exists for FOR UPDATE to lock
    sqlx::query(
        "INSERT INTO subscriptions (user_id, updated_at) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(uid.as_str())
    .bind(update.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to create subscription: {}", e)))?;

    let row: SubscriptionRow = sqlx::query_as(&format!(
        "{} WHERE user_id = $1 FOR UPDATE",
        SELECT_COLUMNS
    ))
    .bind(uid.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to lock subscription: {}", e)))?;

    let mut record = SubscriptionRecord::try_from(row)?;
    if update.is_stale_for(Some(&record)) {
        return Ok(ApplyOutcome::Stale);
    }
    record.apply(update);

    sqlx::query(
        r#"
        UPDATE subscriptions SET
            tier = $2,
            status = $3,
            product_id = $4,
            purchase_token = $5,
            order_id = $6,
            platform = $7,
            auto_renewing = $8,
            expires_at = $9,
            price_amount_micros = $10,
            price_currency_code = $11,
            last_notification_type = $12,
            last_event_at = $13,
            canceled_at = $14,
            expired_at = $15,
            hold_started_at = $16,
            verified_at = $17,
            updated_at = $18
        WHERE user_id = $1
        "#,
    )
    .bind(record.user_id.as_str())
    .bind(record.tier.as_str())
    .bind(record.status.map(|s| s.as_str()))
    .bind(record.product_id.as_ref().map(|p| p.as_str()))
    .bind(record.purchase_token.as_ref().map(|t| t.as_str()))
    .bind(record.order_id.as_ref().map(|o| o.as_str()))
    .bind(record.platform.map(|p| p.as_str()))
    .bind(record.auto_renewing)
    .bind(record.expires_at.map(|t| *t.as_datetime()))
    .bind(record.price_amount_micros)
    .bind(record.price_currency_code.as_deref())
    .bind(record.last_notification_type.map(|n| n.code()))
    .bind(record.last_event_at.map(|t| *t.as_datetime()))
    .bind(record.canceled_at.map(|t| *t.as_datetime()))
    .bind(record.expired_at.map(|t| *t.as_datetime()))
    .bind(record.hold_started_at.map(|t| *t.as_datetime()))
    .bind(record.verified_at.map(|t| *t.as_datetime()))
    .bind(record.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

    Ok(ApplyOutcome::Applied)
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_user_id(
        &self,
        uid: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE user_id = $1", SELECT_COLUMNS))
                .bind(uid.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to find subscription: {}", e))
                })?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_user_by_purchase_token(
        &self,
        token: &PurchaseToken,
    ) -> Result<Option<UserId>, DomainError> {
        let user_id: Option<String> = sqlx::query_scalar(
            "SELECT user_id FROM subscriptions WHERE purchase_token = $1 LIMIT 1",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve purchase token: {}", e)))?;

        user_id
            .map(UserId::new)
            .transpose()
            .map_err(|e| DomainError::corrupt_record("user_id", e))
    }

    async fn apply(
        &self,
        uid: &UserId,
        update: &SubscriptionUpdate,
    ) -> Result<ApplyOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let outcome = apply_update(&mut *tx, uid, update).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit subscription: {}", e)))?;

        Ok(outcome)
    }

    async fn find_lapsed(&self, now: Timestamp) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM subscriptions WHERE tier = 'premium' AND expires_at < $1",
        )
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to query lapsed subscriptions: {}", e)))?;

        ids.into_iter()
            .map(|id| UserId::new(id).map_err(|e| DomainError::corrupt_record("user_id", e)))
            .collect()
    }

    async fn expire_lapsed(&self, uids: &[UserId], now: Timestamp) -> Result<u64, DomainError> {
        if uids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<String> = uids.iter().map(|uid| uid.as_str().to_string()).collect();

        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                tier = 'free',
                expired_at = $2,
                updated_at = $2
            WHERE user_id = ANY($1)
              AND tier = 'premium'
              AND expires_at < $2
            "#,
        )
        .bind(&ids)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to expire subscriptions: {}", e)))?;

        Ok(result.rows_affected())
    }
}
