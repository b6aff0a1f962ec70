use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ProjectResult;
use crate::models::Project;
use crate::repository::ProjectRepository;

#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, project: Project) {
        self.projects.write().await.insert(project.id, project);
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn get_by_id(&self, id: Uuid) -> ProjectResult<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn list_for_member(&self, user_id: Uuid) -> ProjectResult<Vec<Project>> {
        let projects = self.projects.read().await;
        Ok(projects
            .values()
            .filter(|p| p.owner_id == user_id || p.member_ids.contains(&user_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_for_member_includes_owner() {
        let repo = InMemoryProjectRepository::new();
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let outsider = Uuid::new_v4();

        repo.insert(Project::new("Apollo", owner, vec![member])).await;

        assert_eq!(repo.list_for_member(owner).await.unwrap().len(), 1);
        assert_eq!(repo.list_for_member(member).await.unwrap().len(), 1);
        assert!(repo.list_for_member(outsider).await.unwrap().is_empty());
    }
}
