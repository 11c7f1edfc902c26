//! In-process storage with the same semantics as the SQL schema.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StorageGateway;
use crate::error::{StorageError, StorageResult};
use crate::models::{Group, NewGroup, NewWorkspace, Tab, Workspace, WorkspacePatch};

#[derive(Default)]
struct Tables {
    workspaces: Vec<Workspace>,
    tabs: Vec<Tab>,
    groups: Vec<Group>,
    next_workspace_id: i64,
    next_tab_id: i64,
    next_group_id: i64,
}

impl Tables {
    fn owned_workspace(&self, user_id: &str, id: i64) -> Option<usize> {
        self.workspaces
            .iter()
            .position(|w| w.id == id && w.user_id == user_id)
    }
}

/// A single lock guards all tables, so a creation is published all at once.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_not_empty(value: &str, column: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::Rejected(format!(
            "new row violates check constraint on {column}"
        )));
    }
    Ok(())
}

#[async_trait]
impl StorageGateway for MemoryStore {
    async fn create_workspace(&self, new: NewWorkspace) -> StorageResult<Workspace> {
        let mut tables = self.tables.write().await;
        check_not_empty(&new.name, "workspaces.name")?;

        // Stage everything first; nothing is visible until every row is valid.
        let workspace_id = tables.next_workspace_id + 1;
        let mut staged = Vec::with_capacity(new.tabs.len());
        for (offset, tab) in new.tabs.into_iter().enumerate() {
            check_not_empty(&tab.url, "tabs.url")?;
            staged.push(Tab {
                id: tables.next_tab_id + 1 + offset as i64,
                workspace_id,
                url: tab.url,
                title: tab.title,
                favicon_url: tab.favicon_url,
                position: tab.position,
            });
        }

        let workspace = Workspace {
            id: workspace_id,
            user_id: new.user_id,
            name: new.name,
            description: new.description,
            created_at: new.created_at,
            updated_at: new.created_at,
            last_accessed_at: None,
            tabs: Vec::new(),
        };

        tables.next_workspace_id = workspace_id;
        tables.next_tab_id += staged.len() as i64;
        tables.workspaces.push(workspace.clone());
        tables.tabs.extend(staged.iter().cloned());

        Ok(Workspace {
            tabs: staged,
            ..workspace
        })
    }

    async fn list_workspaces(&self, user_id: &str) -> StorageResult<Vec<Workspace>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Workspace> = tables
            .workspaces
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn find_workspace(&self, user_id: &str, id: i64) -> StorageResult<Option<Workspace>> {
        let tables = self.tables.read().await;
        Ok(tables
            .owned_workspace(user_id, id)
            .map(|idx| tables.workspaces[idx].clone()))
    }

    async fn list_tabs(&self, user_id: &str, workspace_id: i64) -> StorageResult<Vec<Tab>> {
        let tables = self.tables.read().await;
        if tables.owned_workspace(user_id, workspace_id).is_none() {
            return Ok(Vec::new());
        }
        let mut tabs: Vec<Tab> = tables
            .tabs
            .iter()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect();
        tabs.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        Ok(tabs)
    }

    async fn update_workspace(
        &self,
        user_id: &str,
        id: i64,
        patch: WorkspacePatch,
    ) -> StorageResult<Option<Workspace>> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.owned_workspace(user_id, id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            check_not_empty(name, "workspaces.name")?;
        }

        let row = &mut tables.workspaces[idx];
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(description) = patch.description {
            row.description = Some(description);
        }
        if let Some(accessed) = patch.last_accessed_at {
            row.last_accessed_at = Some(accessed);
        }
        row.updated_at = patch.updated_at;
        Ok(Some(row.clone()))
    }

    async fn delete_workspace(&self, user_id: &str, id: i64) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.owned_workspace(user_id, id) else {
            return Ok(false);
        };
        tables.workspaces.remove(idx);
        // ON DELETE CASCADE
        tables.tabs.retain(|t| t.workspace_id != id);
        Ok(true)
    }

    async fn create_group(&self, new: NewGroup) -> StorageResult<Group> {
        let mut tables = self.tables.write().await;
        check_not_empty(&new.name, "groups.name")?;
        tables.next_group_id += 1;
        let group = Group {
            id: tables.next_group_id,
            user_id: new.user_id,
            name: new.name,
            color: new.color,
            created_at: new.created_at,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self, user_id: &str) -> StorageResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Group> = tables
            .groups
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn delete_group(&self, user_id: &str, id: i64) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.groups.len();
        tables.groups.retain(|g| !(g.id == id && g.user_id == user_id));
        Ok(tables.groups.len() != before)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
