//! PostgreSQL implementation of NotificationLog.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entitlement::NotificationLogEntry;
use crate::domain::foundation::DomainError;
use crate::ports::NotificationLog;

pub struct PostgresNotificationLog {
    pool: PgPool,
}

impl PostgresNotificationLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLog for PostgresNotificationLog {
    async fn append(&self, entry: &NotificationLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO play_notifications_log (
                id, package_name, event_time_millis, notification_type, subscription_id,
                purchase_token, status, details, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.package_name.as_deref())
        .bind(entry.event_time_millis.as_deref())
        .bind(entry.notification_type.map(|kind| kind.code()))
        .bind(entry.subscription_id.as_deref())
        .bind(entry.purchase_token.as_deref())
        .bind(entry.status.as_str())
        .bind(entry.details.as_deref())
        .bind(entry.processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append notification log: {}", e)))?;

        Ok(())
    }
}
