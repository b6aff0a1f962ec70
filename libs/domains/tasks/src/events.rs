use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Task, TaskStatus};

pub const TASK_CREATED: &str = "task.created";
pub const TASK_UPDATED: &str = "task.updated";
pub const TASK_DELETED: &str = "task.deleted";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskCreatedEvent {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl TaskCreatedEvent {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            project_id: task.project_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            assignee_id: task.assignee_id,
            due_date: task.due_date,
            created_by: task.created_by,
            occurred_at: task.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdatedEvent {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    /// Field names that actually changed in this write, e.g. `["status"]`.
    pub changed_fields: Vec<String>,
    pub updated_by: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl TaskUpdatedEvent {
    pub fn from_task(task: &Task, changed_fields: Vec<String>) -> Self {
        Self {
            task_id: task.id,
            project_id: task.project_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            assignee_id: task.assignee_id,
            due_date: task.due_date,
            changed_fields,
            updated_by: task.modified_by,
            occurred_at: task.updated_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDeletedEvent {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub deleted_by: Uuid,
    pub occurred_at: DateTime<Utc>,
}

/// A decoded task event, tagged by its routing key.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskEvent {
    Created(TaskCreatedEvent),
    Updated(TaskUpdatedEvent),
    Deleted(TaskDeletedEvent),
}

impl TaskEvent {
    /// Decode a broker payload by routing key. Returns `Ok(None)` for routing
    /// keys this domain does not know; malformed payloads are an error.
    pub fn decode(routing_key: &str, payload: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        let event = match routing_key {
            TASK_CREATED => Some(Self::Created(serde_json::from_slice(payload)?)),
            TASK_UPDATED => Some(Self::Updated(serde_json::from_slice(payload)?)),
            TASK_DELETED => Some(Self::Deleted(serde_json::from_slice(payload)?)),
            _ => None,
        };
        Ok(event)
    }

    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::Created(_) => TASK_CREATED,
            Self::Updated(_) => TASK_UPDATED,
            Self::Deleted(_) => TASK_DELETED,
        }
    }

    pub fn task_id(&self) -> Uuid {
        match self {
            Self::Created(e) => e.task_id,
            Self::Updated(e) => e.task_id,
            Self::Deleted(e) => e.task_id,
        }
    }

    pub fn project_id(&self) -> Uuid {
        match self {
            Self::Created(e) => e.project_id,
            Self::Updated(e) => e.project_id,
            Self::Deleted(e) => e.project_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Created(e) => &e.title,
            Self::Updated(e) => &e.title,
            Self::Deleted(e) => &e.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_created_event() {
        let event = TaskCreatedEvent {
            task_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Ship it".to_string(),
            description: None,
            status: TaskStatus::Todo,
            assignee_id: None,
            due_date: None,
            created_by: Uuid::new_v4(),
            occurred_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&event).unwrap();

        let decoded = TaskEvent::decode(TASK_CREATED, &payload).unwrap();
        assert_eq!(decoded, Some(TaskEvent::Created(event)));
    }

    #[test]
    fn test_decode_unknown_routing_key() {
        let decoded = TaskEvent::decode("task.archived", b"{}").unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn test_decode_malformed_payload_is_an_error() {
        assert!(TaskEvent::decode(TASK_UPDATED, b"not-json").is_err());
    }
}
