use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TaskResult;
use crate::models::{PageRequest, PaginatedResult, Task, TaskFilter, TaskSort};

/// Storage seam for tasks. Persistence itself lives outside this crate; the
/// service only needs these operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>>;

    async fn find(&self, filter: TaskFilter) -> TaskResult<Vec<Task>>;

    async fn get_paginated(
        &self,
        page: PageRequest,
        filter: TaskFilter,
        sort: TaskSort,
    ) -> TaskResult<PaginatedResult<Task>>;

    async fn add(&self, task: Task) -> TaskResult<Task>;

    async fn update(&self, task: Task) -> TaskResult<Task>;

    /// Returns whether a task was actually removed.
    async fn delete(&self, id: Uuid) -> TaskResult<bool>;
}
