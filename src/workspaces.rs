//! Workspace service: validation, timestamps and tab hydration on top of the gateway.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateWorkspaceRequest, NewTab, NewWorkspace, UpdateWorkspaceRequest, Workspace,
    WorkspacePatch,
};
use crate::storage::StorageGateway;

/// Upper bound on tab reads in flight for one listing.
pub(crate) const TAB_READ_CONCURRENCY: usize = 8;

#[derive(Clone)]
pub struct WorkspaceService {
    store: Arc<dyn StorageGateway>,
}

impl WorkspaceService {
    pub fn new(store: Arc<dyn StorageGateway>) -> Self {
        Self { store }
    }

    /// Saves a workspace together with its tabs in one atomic write.
    /// Tab positions are stored exactly as supplied.
    pub async fn create(&self, user_id: &str, req: CreateWorkspaceRequest) -> AppResult<Workspace> {
        if req.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Workspace name is required".into()));
        }
        if req.tabs.is_empty() {
            return Err(AppError::InvalidInput("At least one tab is required".into()));
        }
        if req.tabs.iter().any(|tab| tab.url.trim().is_empty()) {
            return Err(AppError::InvalidInput("Every tab needs a url".into()));
        }

        let new = NewWorkspace {
            user_id: user_id.to_string(),
            name: req.name,
            description: req.description,
            created_at: Utc::now(),
            tabs: req.tabs.into_iter().map(NewTab::from).collect(),
        };

        // The write sequence runs to completion even if the caller is dropped.
        let store = self.store.clone();
        let workspace = tokio::spawn(async move { store.create_workspace(new).await })
            .await
            .map_err(|err| AppError::Internal(format!("create task failed: {err}")))??;

        tracing::info!(
            workspace_id = workspace.id,
            tabs = workspace.tabs.len(),
            "workspace created"
        );
        Ok(workspace)
    }

    /// All of the user's workspaces, newest first, each with its tabs.
    ///
    /// A failed tab read degrades that entry to an empty tab list instead of
    /// failing the whole listing. An entry whose tabs read back empty was
    /// deleted after the row read and is left out.
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<Workspace>> {
        let workspaces = self.store.list_workspaces(user_id).await?;

        let ids: Vec<i64> = workspaces.iter().map(|ws| ws.id).collect();
        let tab_sets: Vec<_> = stream::iter(
            ids.into_iter()
                .map(|id| self.store.list_tabs(user_id, id)),
        )
        .buffered(TAB_READ_CONCURRENCY)
        .collect()
        .await;

        Ok(workspaces
            .into_iter()
            .zip(tab_sets)
            .filter_map(|(mut ws, tabs)| match tabs {
                Ok(tabs) if tabs.is_empty() => None,
                Ok(tabs) => {
                    ws.tabs = tabs;
                    Some(ws)
                }
                Err(err) => {
                    tracing::warn!(workspace_id = ws.id, error = %err, "could not load tabs");
                    Some(ws)
                }
            })
            .collect())
    }

    /// Tabs for a row that was just read; none left means it is gone.
    async fn hydrate(&self, user_id: &str, mut workspace: Workspace) -> AppResult<Workspace> {
        let tabs = self.store.list_tabs(user_id, workspace.id).await?;
        if tabs.is_empty() {
            return Err(AppError::NotFound("Workspace"));
        }
        workspace.tabs = tabs;
        Ok(workspace)
    }

    /// A workspace the user owns. Someone else's id looks exactly like a missing one.
    pub async fn get(&self, user_id: &str, id: i64) -> AppResult<Workspace> {
        let workspace = self
            .store
            .find_workspace(user_id, id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;
        self.hydrate(user_id, workspace).await
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: i64,
        req: UpdateWorkspaceRequest,
    ) -> AppResult<Workspace> {
        if matches!(&req.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::InvalidInput("Workspace name cannot be empty".into()));
        }

        let workspace = self
            .store
            .update_workspace(
                user_id,
                id,
                WorkspacePatch {
                    name: req.name,
                    description: req.description,
                    last_accessed_at: req.last_accessed_at,
                    updated_at: Utc::now(),
                },
            )
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;
        let workspace = self.hydrate(user_id, workspace).await?;

        tracing::info!(workspace_id = id, "workspace updated");
        Ok(workspace)
    }

    /// One scoped delete; the tabs follow through the cascade.
    pub async fn delete(&self, user_id: &str, id: i64) -> AppResult<()> {
        if !self.store.delete_workspace(user_id, id).await? {
            return Err(AppError::NotFound("Workspace"));
        }
        tracing::info!(workspace_id = id, "workspace deleted");
        Ok(())
    }
}
