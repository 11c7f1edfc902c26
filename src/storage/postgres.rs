//! SQL backend over a shared `sqlx` connection pool.
//!
//! Workspace creation is one transaction: the parent row is inserted first and
//! its id is used for every tab insert on the same connection. Any error drops
//! the transaction, which rolls it back, so no partial workspace is ever visible.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{StorageGateway, SCHEMA};
use crate::error::{StorageError, StorageResult};
use crate::models::{Group, NewGroup, NewWorkspace, Tab, Workspace, WorkspacePatch};

const WORKSPACE_COLUMNS: &str =
    "id, user_id, name, description, created_at, updated_at, last_accessed_at";
const TAB_COLUMNS: &str = "id, workspace_id, url, title, favicon_url, position";
const GROUP_COLUMNS: &str = "id, user_id, name, color, created_at";

/// SQLSTATE classes that mean the server or connection went away:
/// 08 connection exception, 53 insufficient resources, 57P operator intervention.
fn is_unavailable_sqlstate(code: &str) -> bool {
    code.starts_with("08") || code.starts_with("53") || code.starts_with("57P")
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                let unavailable = db.code().is_some_and(|code| is_unavailable_sqlstate(&code));
                if unavailable {
                    StorageError::Unavailable(db.to_string())
                } else {
                    StorageError::Rejected(db.to_string())
                }
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::RowNotFound => StorageError::Decode(err.to_string()),
            sqlx::Error::Configuration(_)
            | sqlx::Error::Encode(_)
            | sqlx::Error::InvalidArgument(_) => StorageError::Rejected(err.to_string()),
            // Io, Tls, Protocol, PoolTimedOut, PoolClosed, WorkerCrashed, ...
            other => StorageError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies `schema.sql`. Safe to run on every start.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl StorageGateway for PostgresStore {
    async fn create_workspace(&self, new: NewWorkspace) -> StorageResult<Workspace> {
        let mut tx = self.pool.begin().await?;

        let mut workspace: Workspace = sqlx::query_as(&format!(
            "INSERT INTO workspaces (user_id, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {WORKSPACE_COLUMNS}"
        ))
        .bind(&new.user_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let insert_tab = format!(
            "INSERT INTO tabs (workspace_id, url, title, favicon_url, position, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TAB_COLUMNS}"
        );
        let mut tabs = Vec::with_capacity(new.tabs.len());
        for tab in &new.tabs {
            let row: Tab = sqlx::query_as(&insert_tab)
                .bind(workspace.id)
                .bind(&tab.url)
                .bind(&tab.title)
                .bind(&tab.favicon_url)
                .bind(tab.position)
                .bind(new.created_at)
                .fetch_one(&mut *tx)
                .await?;
            tabs.push(row);
        }

        tx.commit().await?;
        workspace.tabs = tabs;
        Ok(workspace)
    }

    async fn list_workspaces(&self, user_id: &str) -> StorageResult<Vec<Workspace>> {
        let rows = sqlx::query_as(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_workspace(&self, user_id: &str, id: i64) -> StorageResult<Option<Workspace>> {
        let row = sqlx::query_as(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_tabs(&self, user_id: &str, workspace_id: i64) -> StorageResult<Vec<Tab>> {
        let rows = sqlx::query_as(
            "SELECT t.id, t.workspace_id, t.url, t.title, t.favicon_url, t.position \
             FROM tabs t JOIN workspaces w ON w.id = t.workspace_id \
             WHERE t.workspace_id = $1 AND w.user_id = $2 \
             ORDER BY t.position ASC, t.id ASC",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_workspace(
        &self,
        user_id: &str,
        id: i64,
        patch: WorkspacePatch,
    ) -> StorageResult<Option<Workspace>> {
        // COALESCE keeps columns the patch does not mention.
        let row = sqlx::query_as(&format!(
            "UPDATE workspaces SET \
                 name = COALESCE($3, name), \
                 description = COALESCE($4, description), \
                 last_accessed_at = COALESCE($5, last_accessed_at), \
                 updated_at = $6 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {WORKSPACE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.last_accessed_at)
        .bind(patch.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_workspace(&self, user_id: &str, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_group(&self, new: NewGroup) -> StorageResult<Group> {
        let row = sqlx::query_as(&format!(
            "INSERT INTO groups (user_id, name, color, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {GROUP_COLUMNS}"
        ))
        .bind(&new.user_id)
        .bind(&new.name)
        .bind(&new.color)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_groups(&self, user_id: &str) -> StorageResult<Vec<Group>> {
        let rows = sqlx::query_as(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_group(&self, user_id: &str, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// The ignored tests need a real database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTab;
    use chrono::Utc;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct FakeDbError {
        code: &'static str,
        message: &'static str,
    }

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            self.message
        }
        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }
        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str, message: &'static str) -> StorageError {
        sqlx::Error::Database(Box::new(FakeDbError { code, message })).into()
    }

    #[test]
    fn test_connection_class_sqlstates_are_retryable() {
        for code in ["08006", "08001", "53300", "57P01", "57P02", "57P03"] {
            let err = db_error(code, "sorry, too many clients already");
            assert!(matches!(err, StorageError::Unavailable(_)), "{code}");
            assert!(err.is_retryable(), "{code}");
        }
    }

    #[test]
    fn test_constraint_and_argument_errors_are_rejected() {
        for code in ["23505", "23514", "22P02"] {
            let err = db_error(code, "violates constraint");
            assert!(matches!(err, StorageError::Rejected(_)), "{code}");
        }

        let encode: StorageError = sqlx::Error::Encode("bad bind".into()).into();
        assert!(matches!(encode, StorageError::Rejected(_)));
        let argument: StorageError = sqlx::Error::InvalidArgument("bad arg".into()).into();
        assert!(matches!(argument, StorageError::Rejected(_)));

        let pool: StorageError = sqlx::Error::PoolTimedOut.into();
        assert!(pool.is_retryable());
        let decode: StorageError = sqlx::Error::RowNotFound.into();
        assert!(matches!(decode, StorageError::Decode(_)));
    }

    async fn store() -> PostgresStore {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let store = PostgresStore::connect(&url, 4).await.expect("connect");
        store.migrate().await.expect("migrate");
        store
    }

    fn unique_user() -> String {
        format!("test-{}", uuid::Uuid::new_v4())
    }

    fn tab(url: &str, position: i32) -> NewTab {
        NewTab {
            url: url.into(),
            title: None,
            favicon_url: None,
            position,
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_failed_child_insert_rolls_back_parent() {
        let store = store().await;
        let user = unique_user();

        let err = store
            .create_workspace(NewWorkspace {
                user_id: user.clone(),
                name: "Half".into(),
                description: None,
                created_at: Utc::now(),
                tabs: vec![tab("https://a.com", 0), tab("https://b.com", 1), tab("", 2)],
            })
            .await
            .expect_err("empty url violates tabs_url_check");
        assert!(matches!(err, StorageError::Rejected(_)));

        assert!(store.list_workspaces(&user).await.unwrap().is_empty());
        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tabs t LEFT JOIN workspaces w ON w.id = t.workspace_id \
             WHERE w.id IS NULL",
        )
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    #[ignore]
    async fn test_round_trip_and_cascade() {
        let store = store().await;
        let user = unique_user();

        let ws = store
            .create_workspace(NewWorkspace {
                user_id: user.clone(),
                name: "Research".into(),
                description: Some("papers".into()),
                created_at: Utc::now(),
                tabs: vec![tab("https://b.com", 1), tab("https://a.com", 0)],
            })
            .await
            .unwrap();

        let urls: Vec<String> = store
            .list_tabs(&user, ws.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.url)
            .collect();
        assert_eq!(urls, ["https://a.com", "https://b.com"]);
        assert!(store.list_tabs("someone-else", ws.id).await.unwrap().is_empty());

        assert!(!store.delete_workspace("someone-else", ws.id).await.unwrap());
        assert!(store.delete_workspace(&user, ws.id).await.unwrap());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tabs WHERE workspace_id = $1")
            .bind(ws.id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
