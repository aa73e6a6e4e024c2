//! PostgreSQL implementation of ProcessedOrderRepository.
//!
//! The ledger insert uses `ON CONFLICT DO NOTHING` against the `order_id`
//! primary key, so concurrent verifications of one order cannot both commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::subscription_repository::apply_update;
use crate::domain::entitlement::{CommitResult, ProcessedOrder, SubscriptionUpdate};
use crate::domain::foundation::{DomainError, OrderId, ProductId, Timestamp, UserId};
use crate::ports::ProcessedOrderRepository;

pub struct PostgresProcessedOrderRepository {
    pool: PgPool,
}

impl PostgresProcessedOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedOrderRow {
    order_id: String,
    uid: String,
    product_id: String,
    processed_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProcessedOrderRow> for ProcessedOrder {
    type Error = DomainError;

    fn try_from(row: ProcessedOrderRow) -> Result<Self, Self::Error> {
        Ok(ProcessedOrder {
            order_id: OrderId::new(row.order_id)?,
            uid: UserId::new(row.uid)?,
            product_id: ProductId::new(row.product_id)?,
            processed_at: Timestamp::from_datetime(row.processed_at),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_ORDER: &str = r#"
    SELECT order_id, uid, product_id, processed_at, expires_at
    FROM processed_orders
    WHERE order_id = $1
"#;

#[async_trait]
impl ProcessedOrderRepository for PostgresProcessedOrderRepository {
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<ProcessedOrder>, DomainError> {
        let row: Option<ProcessedOrderRow> = sqlx::query_as(SELECT_ORDER)
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find processed order: {}", e)))?;

        row.map(ProcessedOrder::try_from).transpose()
    }

    async fn commit_activation(
        &self,
        order: &ProcessedOrder,
        update: &SubscriptionUpdate,
    ) -> Result<CommitResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO processed_orders (order_id, uid, product_id, processed_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(order.uid.as_str())
        .bind(order.product_id.as_str())
        .bind(order.processed_at.as_datetime())
        .bind(order.expires_at.map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record processed order: {}", e)))?
        .rows_affected();

        if inserted == 0 {
            let existing: ProcessedOrderRow = sqlx::query_as(SELECT_ORDER)
                .bind(order.order_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to read claimed order: {}", e))
                })?;
            // tx dropped without commit: nothing from this call persists
            return Ok(CommitResult::AlreadyClaimed(existing.try_into()?));
        }

        apply_update(&mut *tx, &order.uid, update).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit activation: {}", e)))?;

        Ok(CommitResult::Committed)
    }
}
