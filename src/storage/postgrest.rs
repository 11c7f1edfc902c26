//! Row-level REST backend (PostgREST under `/rest/v1`).
//!
//! There is no transaction primitive over this interface. Workspace creation
//! inserts the parent row, then all tabs in one bulk request (atomic as a
//! group on the server), and on tab failure issues an ownership-scoped delete
//! of the parent. This is weaker than the SQL backend: if the process dies
//! between the two requests the parent stays behind without tabs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::StorageGateway;
use crate::error::{StorageError, StorageResult};
use crate::models::{Group, NewGroup, NewWorkspace, Tab, Workspace, WorkspacePatch};

const TAB_SELECT: &str = "id,workspace_id,url,title,favicon_url,position,workspaces!inner(user_id)";

pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

fn transport_error(err: reqwest::Error) -> StorageError {
    if err.is_decode() {
        StorageError::Decode(err.to_string())
    } else {
        StorageError::Unavailable(err.to_string())
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> StorageError {
    let detail = format!("{status}: {body}");
    if status.is_server_error() {
        StorageError::Unavailable(detail)
    } else {
        StorageError::Rejected(detail)
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Like `request`, but asks for the affected rows back.
    fn returning(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=representation")
    }

    async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> StorageResult<Vec<T>> {
        let response: Response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        response.json().await.map_err(transport_error)
    }

    async fn single<T: DeserializeOwned>(request: RequestBuilder) -> StorageResult<T> {
        Self::rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Decode("insert returned no row".into()))
    }

    async fn insert_tabs(&self, workspace_id: i64, new: &NewWorkspace) -> StorageResult<Vec<Tab>> {
        let body: Vec<Value> = new
            .tabs
            .iter()
            .map(|tab| {
                json!({
                    "workspace_id": workspace_id,
                    "url": tab.url,
                    "title": tab.title,
                    "favicon_url": tab.favicon_url,
                    "position": tab.position,
                    "created_at": new.created_at,
                })
            })
            .collect();

        let tabs: Vec<Tab> = Self::rows(
            self.returning(Method::POST, "tabs")
                .query(&[("select", "id,workspace_id,url,title,favicon_url,position")])
                .json(&body),
        )
        .await?;
        if tabs.len() != new.tabs.len() {
            return Err(StorageError::Decode(format!(
                "expected {} tab rows, got {}",
                new.tabs.len(),
                tabs.len()
            )));
        }
        Ok(tabs)
    }
}

#[async_trait]
impl StorageGateway for RestStore {
    async fn create_workspace(&self, new: NewWorkspace) -> StorageResult<Workspace> {
        let mut workspace: Workspace = Self::single(self.returning(Method::POST, "workspaces").json(
            &json!({
                "user_id": new.user_id,
                "name": new.name,
                "description": new.description,
                "created_at": new.created_at,
                "updated_at": new.created_at,
            }),
        ))
        .await?;

        match self.insert_tabs(workspace.id, &new).await {
            Ok(tabs) => {
                workspace.tabs = tabs;
                Ok(workspace)
            }
            Err(err) => {
                // Compensate; ON DELETE CASCADE removes anything that did land.
                if let Err(cleanup) = self.delete_workspace(&new.user_id, workspace.id).await {
                    tracing::error!(
                        workspace_id = workspace.id,
                        error = %cleanup,
                        "compensating delete failed; workspace row left without tabs"
                    );
                }
                Err(err)
            }
        }
    }

    async fn list_workspaces(&self, user_id: &str) -> StorageResult<Vec<Workspace>> {
        Self::rows(self.request(Method::GET, "workspaces").query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc,id.desc".to_string()),
        ]))
        .await
    }

    async fn find_workspace(&self, user_id: &str, id: i64) -> StorageResult<Option<Workspace>> {
        let rows: Vec<Workspace> = Self::rows(self.request(Method::GET, "workspaces").query(&[
            ("select", "*".to_string()),
            ("id", eq(id)),
            ("user_id", eq(user_id)),
        ]))
        .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_tabs(&self, user_id: &str, workspace_id: i64) -> StorageResult<Vec<Tab>> {
        // The inner embed applies the owner predicate through the parent row.
        Self::rows(self.request(Method::GET, "tabs").query(&[
            ("select", TAB_SELECT.to_string()),
            ("workspace_id", eq(workspace_id)),
            ("workspaces.user_id", eq(user_id)),
            ("order", "position.asc,id.asc".to_string()),
        ]))
        .await
    }

    async fn update_workspace(
        &self,
        user_id: &str,
        id: i64,
        patch: WorkspacePatch,
    ) -> StorageResult<Option<Workspace>> {
        let mut body = serde_json::Map::new();
        body.insert("updated_at".into(), json!(patch.updated_at));
        if let Some(name) = patch.name {
            body.insert("name".into(), json!(name));
        }
        if let Some(description) = patch.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(accessed) = patch.last_accessed_at {
            body.insert("last_accessed_at".into(), json!(accessed));
        }

        let rows: Vec<Workspace> = Self::rows(
            self.returning(Method::PATCH, "workspaces")
                .query(&[("id", eq(id)), ("user_id", eq(user_id))])
                .json(&body),
        )
        .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_workspace(&self, user_id: &str, id: i64) -> StorageResult<bool> {
        let rows: Vec<Value> = Self::rows(self.returning(Method::DELETE, "workspaces").query(&[
            ("select", "id".to_string()),
            ("id", eq(id)),
            ("user_id", eq(user_id)),
        ]))
        .await?;
        Ok(!rows.is_empty())
    }

    async fn create_group(&self, new: NewGroup) -> StorageResult<Group> {
        Self::single(self.returning(Method::POST, "groups").json(&json!({
            "user_id": new.user_id,
            "name": new.name,
            "color": new.color,
            "created_at": new.created_at,
        })))
        .await
    }

    async fn list_groups(&self, user_id: &str) -> StorageResult<Vec<Group>> {
        Self::rows(self.request(Method::GET, "groups").query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc,id.desc".to_string()),
        ]))
        .await
    }

    async fn delete_group(&self, user_id: &str, id: i64) -> StorageResult<bool> {
        let rows: Vec<Value> = Self::rows(self.returning(Method::DELETE, "groups").query(&[
            ("select", "id".to_string()),
            ("id", eq(id)),
            ("user_id", eq(user_id)),
        ]))
        .await?;
        Ok(!rows.is_empty())
    }

    async fn ping(&self) -> StorageResult<()> {
        let _: Vec<Value> = Self::rows(
            self.request(Method::GET, "workspaces")
                .query(&[("select", "id"), ("limit", "1")]),
        )
        .await?;
        Ok(())
    }
}
