//! NotificationLog port - append-only audit trail of lifecycle notifications.

use async_trait::async_trait;

use crate::domain::entitlement::NotificationLogEntry;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn append(&self, entry: &NotificationLogEntry) -> Result<(), DomainError>;
}
