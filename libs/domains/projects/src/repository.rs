use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProjectResult;
use crate::models::Project;

/// Read access to projects; the notification pipeline only needs lookups.
#[mockall::automock]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> ProjectResult<Option<Project>>;

    /// Projects a user belongs to, used to join push groups on connect.
    async fn list_for_member(&self, user_id: Uuid) -> ProjectResult<Vec<Project>>;
}
