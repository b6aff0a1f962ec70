use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};
use crate::models::{PageRequest, PaginatedResult, Task, TaskFilter, TaskSort, TaskSortField};
use crate::repository::TaskRepository;

/// In-process [`TaskRepository`] used by tests and by deployments without an
/// external store.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

fn compare(a: &Task, b: &Task, sort: &TaskSort) -> Ordering {
    let ordering = match sort.field {
        TaskSortField::Title => a.title.cmp(&b.title),
        TaskSortField::Status => a.status.to_string().cmp(&b.status.to_string()),
        TaskSortField::DueDate => a.due_date.cmp(&b.due_date),
        TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    if sort.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn find(&self, filter: TaskFilter) -> TaskResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }

    async fn get_paginated(
        &self,
        page: PageRequest,
        filter: TaskFilter,
        sort: TaskSort,
    ) -> TaskResult<PaginatedResult<Task>> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(a, b, &sort));

        let total_count = matching.len() as u64;
        let items: Vec<Task> = matching
            .into_iter()
            .skip(page.offset())
            .take(page.page_size as usize)
            .collect();

        Ok(PaginatedResult::new(items, total_count, &page))
    }

    async fn add(&self, task: Task) -> TaskResult<Task> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update(&self, task: Task) -> TaskResult<Task> {
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(&task.id) {
            return Err(TaskError::NotFound(task.id));
        }
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> TaskResult<bool> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.remove(&id).is_some())
    }
}
