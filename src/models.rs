use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Color assigned to a group when the client does not pick one.
pub const DEFAULT_GROUP_COLOR: &str = "#3b82f6";

/// A saved browser workspace. `tabs` is hydrated separately from the row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
pub struct Workspace {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

/// A browser tab belonging to exactly one workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
pub struct Tab {
    pub id: i64,
    pub workspace_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub favicon_url: Option<String>,
    pub position: i32,
}

/// A user-owned label with a display color.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
pub struct Group {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

// --- Request bodies ---

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tabs: Vec<CreateTabRequest>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CreateTabRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
    /// Sort key within the workspace; stored as given.
    #[serde(default)]
    pub position: i32,
}

/// Partial update; absent fields are left untouched.
///
/// `null` counts as absent, so a description can be replaced but not cleared.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct UpdateWorkspaceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

// --- Storage inputs (validated, timestamped by the services) ---

#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tabs: Vec<NewTab>,
}

#[derive(Serialize, Debug, Clone)]
pub struct NewTab {
    pub url: String,
    pub title: Option<String>,
    pub favicon_url: Option<String>,
    pub position: i32,
}

impl From<CreateTabRequest> for NewTab {
    fn from(req: CreateTabRequest) -> Self {
        Self {
            url: req.url,
            title: req.title,
            favicon_url: req.favicon_url,
            position: req.position,
        }
    }
}

/// Fields written by an update. `updated_at` is always set.
#[derive(Debug, Clone)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}
