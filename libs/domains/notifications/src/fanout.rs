use std::sync::Arc;

use async_trait::async_trait;
use broker::{BrokerError, BrokerResult, EventHandler};
use domain_projects::ProjectRepository;
use domain_tasks::TaskEvent;
use domain_users::UserDirectory;
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::NotificationResult;
use crate::hub::{project_group, PushHub, TASK_NOTIFICATION_EVENT};
use crate::models::{Notification, NotificationContent};
use crate::repository::NotificationRepository;
use crate::sender::EmailSender;

/// Turns one task event into one push broadcast plus a notification record
/// and email per project member.
pub struct NotificationFanout {
    projects: Arc<dyn ProjectRepository>,
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationRepository>,
    hub: Arc<dyn PushHub>,
    sender: Arc<dyn EmailSender>,
}

impl NotificationFanout {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        users: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationRepository>,
        hub: Arc<dyn PushHub>,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            projects,
            users,
            notifications,
            hub,
            sender,
        }
    }

    /// Process one decoded event.
    ///
    /// Returns an error only for transient conditions worth a redelivery;
    /// anything unrecoverable is logged and swallowed so the message gets
    /// acknowledged.
    pub async fn handle_task_event(&self, event: &TaskEvent) -> NotificationResult<()> {
        let content = NotificationContent::from_event(event);
        let project_id = event.project_id();

        let Some(project) = self.projects.get_by_id(project_id).await? else {
            warn!(%project_id, task_id = %event.task_id(), "Project not found, dropping event");
            return Ok(());
        };

        // One broadcast for the whole project group. Push is fire-and-forget
        // next to the durable notification records.
        let payload = json!({
            "task_id": event.task_id(),
            "project_id": project_id,
            "title": content.title,
            "message": content.message,
        });
        if let Err(e) = self
            .hub
            .send_to_group(&project_group(project_id), TASK_NOTIFICATION_EVENT, payload)
            .await
        {
            warn!(%project_id, error = %e, "Push broadcast failed");
        }

        // Per-member work runs concurrently; one member's failure never
        // blocks the others.
        let mut recipients: Vec<Uuid> = project.member_ids.clone();
        if !recipients.contains(&project.owner_id) {
            recipients.push(project.owner_id);
        }
        let results = join_all(
            recipients
                .iter()
                .map(|member_id| self.notify_member(*member_id, &content)),
        )
        .await;

        let mut notified = 0;
        for (member_id, result) in recipients.iter().zip(results) {
            match result {
                Ok(true) => notified += 1,
                Ok(false) => {}
                Err(e) => warn!(%member_id, error = %e, "Failed to notify member"),
            }
        }

        info!(
            %project_id,
            task_id = %event.task_id(),
            routing_key = event.routing_key(),
            notified,
            "Processed task event"
        );
        Ok(())
    }

    /// Record and email one member. Returns whether the member was notified;
    /// missing or inactive users are skipped.
    async fn notify_member(
        &self,
        member_id: Uuid,
        content: &NotificationContent,
    ) -> NotificationResult<bool> {
        let Some(user) = self.users.get_by_id(member_id).await? else {
            warn!(%member_id, "Member not found, skipping");
            return Ok(false);
        };
        if !user.is_active {
            debug!(%member_id, "Member inactive, skipping");
            return Ok(false);
        }

        self.notifications
            .add(Notification::new(user.id, &content.title, &content.message))
            .await?;

        self.sender
            .send_email(&user.email, &user.display_name, &content.title, &content.message)
            .await?;

        Ok(true)
    }
}

#[async_trait]
impl EventHandler for NotificationFanout {
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> BrokerResult<()> {
        let event = match TaskEvent::decode(routing_key, payload) {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!(routing_key, "Unknown routing key, acknowledging");
                return Ok(());
            }
            Err(e) => {
                return Err(BrokerError::permanent(format!(
                    "Undecodable payload for {routing_key}: {e}"
                )));
            }
        };

        // The only errors that escape the fan-out are lookup outages; worth
        // a redelivery.
        self.handle_task_event(&event)
            .await
            .map_err(|e| BrokerError::transient(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "notification-fanout"
    }
}
