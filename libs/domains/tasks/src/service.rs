use std::sync::Arc;

use broker::{publish_json, EventPublisher};
use cache::{CacheStore, Dimension, ListQuery, QueryCache, VersionRegistry};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{TaskError, TaskResult};
use crate::events::{self, TaskCreatedEvent, TaskDeletedEvent, TaskUpdatedEvent};
use crate::models::{
    CreateTask, PageRequest, PaginatedResult, Task, TaskFilter, TaskSort, UpdateTask,
};
use crate::repository::TaskRepository;

/// Key family for the task list cache.
pub const KEY_FAMILY: &str = "tasks";

/// Task write and read paths.
///
/// Every write persists first, then bumps the version counters of the
/// dimensions it touched, then publishes a domain event. Reads go through
/// the versioned query cache, so the bumps are what makes post-write reads
/// fresh.
pub struct TaskService<R, S, P>
where
    R: TaskRepository,
    S: CacheStore,
    P: EventPublisher + ?Sized,
{
    repository: Arc<R>,
    cache: QueryCache<S>,
    versions: VersionRegistry<S>,
    publisher: Arc<P>,
}

impl<R, S, P> TaskService<R, S, P>
where
    R: TaskRepository,
    S: CacheStore,
    P: EventPublisher + ?Sized,
{
    pub fn new(repository: Arc<R>, store: Arc<S>, publisher: Arc<P>) -> Self {
        let versions = VersionRegistry::new(store.clone(), KEY_FAMILY);
        let cache = QueryCache::new(store.clone(), VersionRegistry::new(store, KEY_FAMILY));
        Self {
            repository,
            cache,
            versions,
            publisher,
        }
    }

    pub async fn create_task(&self, input: CreateTask, actor: Uuid) -> TaskResult<Task> {
        input.validate()?;

        let task = self.repository.add(Task::new(input, actor)).await?;
        self.versions.bump_all(&affected_dimensions(&task)).await;

        let event = TaskCreatedEvent::from_task(&task);
        publish_json(self.publisher.as_ref(), events::TASK_CREATED, &event).await?;

        info!(task_id = %task.id, project_id = %task.project_id, "Created task");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        input: UpdateTask,
        actor: Uuid,
    ) -> TaskResult<Task> {
        input.validate()?;

        let existing = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))?;

        let (updated, changed_fields) = apply_update(&existing, &input, actor);
        if changed_fields.is_empty() {
            debug!(task_id = %id, "Update changed nothing, skipping side effects");
            return Ok(existing);
        }

        let updated = self.repository.update(updated).await?;

        // Both the before and after values of each dimension need a bump:
        // moving a task out of `todo` stales the `todo` pages as much as the
        // `in_progress` ones.
        let mut dims = affected_dimensions(&existing);
        for dim in affected_dimensions(&updated) {
            if !dims.contains(&dim) {
                dims.push(dim);
            }
        }
        self.versions.bump_all(&dims).await;

        let event = TaskUpdatedEvent::from_task(&updated, changed_fields.clone());
        publish_json(self.publisher.as_ref(), events::TASK_UPDATED, &event).await?;

        info!(task_id = %id, ?changed_fields, "Updated task");
        Ok(updated)
    }

    pub async fn delete_task(&self, id: Uuid, actor: Uuid) -> TaskResult<Task> {
        let existing = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))?;

        if !self.repository.delete(id).await? {
            return Err(TaskError::NotFound(id));
        }
        self.versions.bump_all(&affected_dimensions(&existing)).await;

        let event = TaskDeletedEvent {
            task_id: existing.id,
            project_id: existing.project_id,
            title: existing.title.clone(),
            deleted_by: actor,
            occurred_at: Utc::now(),
        };
        publish_json(self.publisher.as_ref(), events::TASK_DELETED, &event).await?;

        info!(task_id = %id, "Deleted task");
        Ok(existing)
    }

    pub async fn get_task(&self, id: Uuid) -> TaskResult<Task> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Paginated list with read-through caching.
    ///
    /// A failure to build the versioned key (the counters live in the same
    /// store as the entries) degrades to an uncached query.
    pub async fn list_tasks(
        &self,
        filter: TaskFilter,
        sort: TaskSort,
        page: PageRequest,
    ) -> TaskResult<PaginatedResult<Task>> {
        let query = ListQuery {
            project_id: filter.project_id.map(|id| id.to_string()),
            status: filter.status.map(|s| s.to_string()),
            assignee_id: filter.assignee_id.map(|id| id.to_string()),
            sort_field: sort.field.to_string(),
            sort_descending: sort.descending,
            page: page.page,
            page_size: page.page_size,
        };

        let key = match self.cache.key_for(&query).await {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Could not build cache key, querying uncached");
                None
            }
        };

        if let Some(key) = &key {
            if let Some(cached) = self.cache.get::<PaginatedResult<Task>>(key).await {
                return Ok(cached);
            }
        }

        let result = self.repository.get_paginated(page, filter, sort).await?;

        if let Some(key) = &key {
            self.cache.put(key, &result).await;
        }
        Ok(result)
    }
}

/// The cache dimensions a task's presence affects.
fn affected_dimensions(task: &Task) -> Vec<Dimension> {
    let mut dims = vec![
        Dimension::Project(task.project_id.to_string()),
        Dimension::Status(task.status.to_string()),
    ];
    if let Some(assignee_id) = task.assignee_id {
        dims.push(Dimension::Assignee(assignee_id.to_string()));
    }
    dims.push(Dimension::Global);
    dims
}

fn apply_update(task: &Task, input: &UpdateTask, actor: Uuid) -> (Task, Vec<String>) {
    let mut updated = task.clone();
    let mut changed = Vec::new();

    if let Some(title) = &input.title {
        if *title != task.title {
            updated.title = title.clone();
            changed.push("title".to_string());
        }
    }
    if let Some(description) = &input.description {
        if *description != task.description {
            updated.description = description.clone();
            changed.push("description".to_string());
        }
    }
    if let Some(status) = input.status {
        if status != task.status {
            updated.status = status;
            changed.push("status".to_string());
        }
    }
    if let Some(assignee_id) = input.assignee_id {
        if assignee_id != task.assignee_id {
            updated.assignee_id = assignee_id;
            changed.push("assignee_id".to_string());
        }
    }
    if let Some(due_date) = input.due_date {
        if due_date != task.due_date {
            updated.due_date = due_date;
            changed.push("due_date".to_string());
        }
    }
    if let Some(project_id) = input.project_id {
        if project_id != task.project_id {
            updated.project_id = project_id;
            changed.push("project_id".to_string());
        }
    }

    if !changed.is_empty() {
        updated.modified_by = actor;
        updated.updated_at = Utc::now();
    }
    (updated, changed)
}
