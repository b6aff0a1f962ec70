use chrono::{DateTime, Utc};
use domain_tasks::TaskEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(recipient_id: Uuid, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// The human-readable rendering of a task event, shared by the record,
/// push, and email channels.
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationContent {
    pub title: String,
    pub message: String,
}

impl NotificationContent {
    pub fn from_event(event: &TaskEvent) -> Self {
        match event {
            TaskEvent::Created(e) => Self {
                title: "Task Created".to_string(),
                message: format!("A new task '{}' has been created.", e.title),
            },
            TaskEvent::Updated(e) => {
                let message = if e.changed_fields.is_empty() {
                    format!("Task '{}' has been updated.", e.title)
                } else {
                    format!(
                        "Task '{}' has been updated. Changed fields: {}.",
                        e.title,
                        e.changed_fields.join(", ")
                    )
                };
                Self {
                    title: "Task Updated".to_string(),
                    message,
                }
            }
            TaskEvent::Deleted(e) => Self {
                title: "Task Deleted".to_string(),
                message: format!("Task '{}' has been deleted.", e.title),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_tasks::{TaskCreatedEvent, TaskStatus, TaskUpdatedEvent};

    #[test]
    fn test_created_content() {
        let event = TaskEvent::Created(TaskCreatedEvent {
            task_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Fix login".to_string(),
            description: None,
            status: TaskStatus::Todo,
            assignee_id: None,
            due_date: None,
            created_by: Uuid::new_v4(),
            occurred_at: Utc::now(),
        });

        let content = NotificationContent::from_event(&event);
        assert_eq!(content.title, "Task Created");
        assert_eq!(content.message, "A new task 'Fix login' has been created.");
    }

    #[test]
    fn test_updated_content_lists_changed_fields() {
        let event = TaskEvent::Updated(TaskUpdatedEvent {
            task_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Fix login".to_string(),
            description: None,
            status: TaskStatus::Done,
            assignee_id: None,
            due_date: None,
            changed_fields: vec!["status".to_string(), "due_date".to_string()],
            updated_by: Uuid::new_v4(),
            occurred_at: Utc::now(),
        });

        let content = NotificationContent::from_event(&event);
        assert_eq!(content.title, "Task Updated");
        assert_eq!(
            content.message,
            "Task 'Fix login' has been updated. Changed fields: status, due_date."
        );
    }

    #[test]
    fn test_notification_read_state() {
        let mut notification = Notification::new(Uuid::new_v4(), "Title", "Message");
        assert!(!notification.is_read());

        notification.read_at = Some(Utc::now());
        assert!(notification.is_read());
    }
}
