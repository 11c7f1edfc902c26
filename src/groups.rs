use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::models::{CreateGroupRequest, Group, NewGroup, DEFAULT_GROUP_COLOR};
use crate::storage::StorageGateway;

/// Labels a user can attach to workspaces on the client side.
#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn StorageGateway>,
}

impl GroupService {
    pub fn new(store: Arc<dyn StorageGateway>) -> Self {
        Self { store }
    }

    pub async fn create(&self, user_id: &str, req: CreateGroupRequest) -> AppResult<Group> {
        if req.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Group name is required".into()));
        }
        let color = req
            .color
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GROUP_COLOR.to_string());

        let group = self
            .store
            .create_group(NewGroup {
                user_id: user_id.to_string(),
                name: req.name,
                color,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(group_id = group.id, "group created");
        Ok(group)
    }

    pub async fn list(&self, user_id: &str) -> AppResult<Vec<Group>> {
        Ok(self.store.list_groups(user_id).await?)
    }

    pub async fn delete(&self, user_id: &str, id: i64) -> AppResult<()> {
        if !self.store.delete_group(user_id, id).await? {
            return Err(AppError::NotFound("Group"));
        }
        tracing::info!(group_id = id, "group deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> GroupService {
        GroupService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_color_defaults_and_validation() {
        let svc = service();
        let plain = svc
            .create("alice", CreateGroupRequest { name: "Work".into(), color: None })
            .await
            .unwrap();
        assert_eq!(plain.color, DEFAULT_GROUP_COLOR);

        let red = svc
            .create(
                "alice",
                CreateGroupRequest { name: "Urgent".into(), color: Some("#ef4444".into()) },
            )
            .await
            .unwrap();
        assert_eq!(red.color, "#ef4444");

        let err = svc
            .create("alice", CreateGroupRequest { name: String::new(), color: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let names: Vec<String> = svc.list("alice").await.unwrap().into_iter().map(|g| g.name).collect();
        assert_eq!(names, ["Urgent", "Work"]);
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_owner() {
        let svc = service();
        let group = svc
            .create("alice", CreateGroupRequest { name: "Reading".into(), color: None })
            .await
            .unwrap();

        assert!(matches!(svc.delete("bob", group.id).await, Err(AppError::NotFound(_))));
        assert_eq!(svc.list("alice").await.unwrap().len(), 1);
        assert!(svc.list("bob").await.unwrap().is_empty());

        svc.delete("alice", group.id).await.unwrap();
        assert!(svc.list("alice").await.unwrap().is_empty());
    }
}
