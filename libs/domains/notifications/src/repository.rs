use async_trait::async_trait;
use uuid::Uuid;

use crate::error::NotificationResult;
use crate::models::Notification;

/// Storage seam for notification records.
#[mockall::automock]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn add(&self, notification: Notification) -> NotificationResult<Notification>;

    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Option<Notification>>;

    /// Newest first.
    async fn list_for_recipient(&self, recipient_id: Uuid) -> NotificationResult<Vec<Notification>>;

    /// Set or clear the read marker. Returns the updated record, or `None`
    /// when the notification does not exist.
    async fn set_read(&self, id: Uuid, read: bool) -> NotificationResult<Option<Notification>>;
}
