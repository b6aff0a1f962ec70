use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use domain_projects::ProjectRepository;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::NotificationResult;

/// Event name pushed to clients when a task notification arrives.
pub const TASK_NOTIFICATION_EVENT: &str = "receive_task_notification";

/// Push group that receives all task notifications of one project.
pub fn project_group(project_id: Uuid) -> String {
    format!("project_{project_id}")
}

/// One message delivered to a connected client.
#[derive(Clone, Debug, PartialEq)]
pub struct PushEnvelope {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Real-time push seam. The fan-out sends exactly one group broadcast per
/// event; connection bookkeeping happens at the edge.
#[mockall::automock]
#[async_trait]
pub trait PushHub: Send + Sync {
    async fn send_to_group(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> NotificationResult<()>;

    async fn add_to_group(&self, connection_id: &str, group: &str) -> NotificationResult<()>;

    async fn remove_from_group(&self, connection_id: &str, group: &str) -> NotificationResult<()>;
}

#[derive(Default)]
struct HubState {
    connections: HashMap<String, mpsc::UnboundedSender<PushEnvelope>>,
    groups: HashMap<String, HashSet<String>>,
}

/// In-process [`PushHub`]: group membership plus a channel per connection.
#[derive(Default)]
pub struct InProcessHub {
    state: RwLock<HubState>,
}

impl InProcessHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and join it to the given project groups.
    /// Messages pushed to any of those groups arrive on the returned channel.
    pub async fn connect(
        &self,
        connection_id: &str,
        project_ids: &[Uuid],
    ) -> mpsc::UnboundedReceiver<PushEnvelope> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.write().await;
        state.connections.insert(connection_id.to_string(), sender);
        for project_id in project_ids {
            state
                .groups
                .entry(project_group(*project_id))
                .or_default()
                .insert(connection_id.to_string());
        }
        debug!(connection_id, groups = project_ids.len(), "Connection registered");
        receiver
    }

    /// Drop a connection and remove it from every group. Groups left with
    /// no members are removed so the map does not accumulate dead keys.
    pub async fn disconnect(&self, connection_id: &str) {
        let mut state = self.state.write().await;
        state.connections.remove(connection_id);
        state.groups.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
        debug!(connection_id, "Connection removed");
    }

    pub async fn group_size(&self, group: &str) -> usize {
        let state = self.state.read().await;
        state.groups.get(group).map_or(0, HashSet::len)
    }

    /// Number of groups with at least one member.
    pub async fn group_count(&self) -> usize {
        let state = self.state.read().await;
        state.groups.len()
    }
}

/// Register a connection for a user, joining the groups of every project
/// they belong to.
pub async fn connect_for_user(
    hub: &InProcessHub,
    projects: &dyn ProjectRepository,
    connection_id: &str,
    user_id: Uuid,
) -> NotificationResult<mpsc::UnboundedReceiver<PushEnvelope>> {
    let memberships = projects.list_for_member(user_id).await?;
    let project_ids: Vec<Uuid> = memberships.iter().map(|p| p.id).collect();
    Ok(hub.connect(connection_id, &project_ids).await)
}

#[async_trait]
impl PushHub for InProcessHub {
    async fn send_to_group(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> NotificationResult<()> {
        let state = self.state.read().await;
        let Some(members) = state.groups.get(group) else {
            debug!(group, "No connections in group, push dropped");
            return Ok(());
        };

        let envelope = PushEnvelope {
            event: event.to_string(),
            payload,
        };
        let mut delivered = 0;
        for connection_id in members {
            match state.connections.get(connection_id) {
                Some(sender) if sender.send(envelope.clone()).is_ok() => delivered += 1,
                _ => warn!(%connection_id, group, "Skipping dead connection"),
            }
        }
        debug!(group, event, delivered, "Group push delivered");
        Ok(())
    }

    async fn add_to_group(&self, connection_id: &str, group: &str) -> NotificationResult<()> {
        let mut state = self.state.write().await;
        state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(connection_id.to_string());
        Ok(())
    }

    async fn remove_from_group(&self, connection_id: &str, group: &str) -> NotificationResult<()> {
        let mut state = self.state.write().await;
        if let Some(members) = state.groups.get_mut(group) {
            members.remove(connection_id);
            if members.is_empty() {
                state.groups.remove(group);
            }
        }
        Ok(())
    }
}
