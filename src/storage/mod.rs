//! Storage gateway: the only place that talks to the relational store.
//!
//! Every read, update and delete takes the owning user id and applies it as a
//! predicate; a bare record id is never enough to reach a row. Zero matched
//! rows is reported as `None`/`false`, not as an error.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::models::{Group, NewGroup, NewWorkspace, Tab, Workspace, WorkspacePatch};

pub mod memory;
pub mod postgres;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use postgrest::RestStore;

/// DDL for the SQL backend. Idempotent.
pub const SCHEMA: &str = include_str!("schema.sql");

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Inserts the workspace and all of its tabs, or nothing at all.
    /// Tabs come back in the order they were supplied.
    async fn create_workspace(&self, new: NewWorkspace) -> StorageResult<Workspace>;

    /// Workspace rows (without tabs), newest first.
    async fn list_workspaces(&self, user_id: &str) -> StorageResult<Vec<Workspace>>;

    async fn find_workspace(&self, user_id: &str, id: i64) -> StorageResult<Option<Workspace>>;

    /// Tabs of a workspace owned by `user_id`, by ascending position.
    async fn list_tabs(&self, user_id: &str, workspace_id: i64) -> StorageResult<Vec<Tab>>;

    async fn update_workspace(
        &self,
        user_id: &str,
        id: i64,
        patch: WorkspacePatch,
    ) -> StorageResult<Option<Workspace>>;

    /// Deletes the workspace; its tabs go with it. Returns whether a row matched.
    async fn delete_workspace(&self, user_id: &str, id: i64) -> StorageResult<bool>;

    async fn create_group(&self, new: NewGroup) -> StorageResult<Group>;

    /// Groups, newest first.
    async fn list_groups(&self, user_id: &str) -> StorageResult<Vec<Group>>;

    async fn delete_group(&self, user_id: &str, id: i64) -> StorageResult<bool>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> StorageResult<()>;
}

/// Builds the configured gateway. The pool/client inside is shared by all requests.
pub async fn connect(config: &StorageConfig) -> StorageResult<Arc<dyn StorageGateway>> {
    match config.backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StorageError::Unavailable("DATABASE_URL is not set".into()))?;
            let store = PostgresStore::connect(url, config.max_connections).await?;
            if config.auto_migrate {
                store.migrate().await?;
            }
            tracing::info!(backend = "postgres", "storage gateway ready");
            Ok(Arc::new(store))
        }
        StorageBackend::Rest => {
            tracing::warn!(
                backend = "rest",
                "row-level REST storage has no transactions; workspace creation falls back to compensating deletes"
            );
            Ok(Arc::new(RestStore::new(&config.rest_url, &config.service_key)?))
        }
        StorageBackend::Memory => {
            tracing::warn!(backend = "memory", "in-process storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
