use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(input: CreateTask, actor: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id: input.project_id,
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            assignee_id: input.assignee_id,
            due_date: input.due_date,
            created_by: actor,
            modified_by: actor,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CreateTask {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update; `None` fields are left untouched. Clearing an optional
/// field is expressed with a nested `Option`.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub project_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.project_id.is_none_or(|p| task.project_id == p)
            && self.status.is_none_or(|s| task.status == s)
            && self.assignee_id.is_none_or(|a| task.assignee_id == Some(a))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TaskSortField {
    Title,
    Status,
    DueDate,
    #[default]
    CreatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub descending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.page_size) as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: &PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: page.page,
            page_size: page.page_size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tokens() {
        assert_eq!(TaskStatus::Todo.to_string(), "todo");
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
        assert_eq!(TaskStatus::Done.to_string(), "done");
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
    }

    #[test]
    fn test_sort_field_tokens() {
        assert_eq!(TaskSortField::DueDate.to_string(), "duedate");
        assert_eq!(TaskSortField::CreatedAt.to_string(), "createdat");
    }

    #[test]
    fn test_filter_matches() {
        let input = CreateTask {
            project_id: Uuid::new_v4(),
            title: "Write docs".to_string(),
            description: None,
            status: Some(TaskStatus::Todo),
            assignee_id: Some(Uuid::new_v4()),
            due_date: None,
        };
        let project_id = input.project_id;
        let assignee_id = input.assignee_id;
        let task = Task::new(input, Uuid::new_v4());

        assert!(TaskFilter::default().matches(&task));
        assert!(TaskFilter {
            project_id: Some(project_id),
            status: Some(TaskStatus::Todo),
            assignee_id,
        }
        .matches(&task));
        assert!(!TaskFilter {
            status: Some(TaskStatus::Done),
            ..Default::default()
        }
        .matches(&task));
    }

    #[test]
    fn test_page_request_clamps_to_one() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let result = PaginatedResult::<u32>::new(vec![], 21, &PageRequest::new(1, 10));
        assert_eq!(result.total_pages(), 3);
    }
}
