//! PostgreSQL adapters - Database implementations of the entitlement store ports.
//!
//! - `PostgresSubscriptionRepository` - Subscription records with row-locked merge writes
//! - `PostgresProcessedOrderRepository` - Order ledger with transactional activation commit
//! - `PostgresNotificationLog` - Notification audit trail

mod notification_log;
mod processed_order_repository;
mod subscription_repository;

pub use notification_log::PostgresNotificationLog;
pub use processed_order_repository::PostgresProcessedOrderRepository;
pub use subscription_repository::PostgresSubscriptionRepository;

use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Opens a connection pool and, when configured, applies pending migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = config
        .pool_options()
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::database(format!("Failed to connect to database: {}", e)))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to run migrations: {}", e)))?;
        tracing::info!("Database migrations applied");
    }

    Ok(pool)
}
