use async_trait::async_trait;

use crate::error::NotificationResult;

/// Email delivery seam; the SMTP implementation lives in
/// [`crate::providers::smtp`].
#[mockall::automock]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body: &str,
    ) -> NotificationResult<()>;
}
