//! Postgres-backed todo store
//!
//! Each operation is a single statement. Ownership is part of every `WHERE`
//! clause, so there is no window between checking a row and mutating it.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use super::{DeleteTarget, NewTodo, StoreError, Todo, TodoPatch, TodoSelector, TodoStore};
use crate::metrics::STORE_OPERATION_DURATION;

const COLUMNS: &str = "id, user_id, title, description, completed, created_at, updated_at";

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS todos (
    id          BIGSERIAL PRIMARY KEY,
    user_id     TEXT        NOT NULL,
    title       TEXT        NOT NULL,
    description TEXT,
    completed   BOOLEAN     NOT NULL DEFAULT FALSE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS todos_user_created_idx ON todos (user_id, created_at DESC)";

/// Todo store over a shared Postgres connection pool
#[derive(Clone)]
pub struct PgTodoStore {
    pool: PgPool,
}

impl PgTodoStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool that opens its first connection on first use
    ///
    /// # Arguments
    /// * `database_url` - Postgres connection string
    /// * `max_connections` - Upper bound on pooled connections
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Create the `todos` table and its index if they are missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&self.pool).await?;
        info!("todos schema ensured");
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `WHERE` predicate for an update selector; `$1` is always the user id.
fn selector_predicate(selector: &TodoSelector) -> &'static str {
    match selector {
        TodoSelector::Id(_) => "user_id = $1 AND id = $2",
        TodoSelector::Title(_) => {
            "user_id = $1 AND id = (SELECT id FROM todos WHERE user_id = $1 AND title = $2 ORDER BY id LIMIT 1)"
        }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Todo>, StoreError> {
        let _timer = STORE_OPERATION_DURATION
            .with_label_values(&["list"])
            .start_timer();

        let sql = format!(
            "SELECT {COLUMNS} FROM todos WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let todos = sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(todos)
    }

    async fn create(&self, user_id: &str, todo: NewTodo) -> Result<Todo, StoreError> {
        let todo = todo.validated()?;
        let _timer = STORE_OPERATION_DURATION
            .with_label_values(&["create"])
            .start_timer();

        let sql = format!(
            "INSERT INTO todos (user_id, title, description, completed) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .bind(todo.title.as_str())
            .bind(todo.description.as_deref())
            .bind(todo.completed)
            .fetch_one(&self.pool)
            .await?;

        debug!(user_id, id = created.id, "todo created");
        Ok(created)
    }

    async fn update(
        &self,
        user_id: &str,
        selector: TodoSelector,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let patch = patch.validated()?;
        let _timer = STORE_OPERATION_DURATION
            .with_label_values(&["update"])
            .start_timer();

        let predicate = selector_predicate(&selector);
        let sql = if patch.is_empty() {
            format!("SELECT {COLUMNS} FROM todos WHERE {predicate}")
        } else {
            format!(
                "UPDATE todos SET \
                 title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 completed = COALESCE($5, completed), \
                 updated_at = NOW() \
                 WHERE {predicate} RETURNING {COLUMNS}"
            )
        };

        let mut query = sqlx::query_as::<_, Todo>(&sql).bind(user_id);
        query = match &selector {
            TodoSelector::Id(id) => query.bind(*id),
            TodoSelector::Title(title) => query.bind(title.clone()),
        };
        if !patch.is_empty() {
            query = query
                .bind(patch.title)
                .bind(patch.description)
                .bind(patch.completed);
        }

        let row = query.fetch_optional(&self.pool).await?;
        debug!(user_id, ?selector, found = row.is_some(), "todo update");
        Ok(row)
    }

    async fn delete(&self, user_id: &str, target: DeleteTarget) -> Result<bool, StoreError> {
        let _timer = STORE_OPERATION_DURATION
            .with_label_values(&["delete"])
            .start_timer();

        let result = match &target {
            DeleteTarget::Id(id) => {
                sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
                    .bind(*id)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            DeleteTarget::Title(title) => {
                sqlx::query("DELETE FROM todos WHERE lower(title) = lower($1) AND user_id = $2")
                    .bind(title.as_str())
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            DeleteTarget::Description(description) => {
                sqlx::query(
                    "DELETE FROM todos WHERE lower(description) = lower($1) AND user_id = $2",
                )
                .bind(description.as_str())
                .bind(user_id)
                .execute(&self.pool)
                .await?
            }
        };

        debug!(user_id, ?target, rows = result.rows_affected(), "todo delete");
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError> {
        let _timer = STORE_OPERATION_DURATION
            .with_label_values(&["delete_all"])
            .start_timer();

        let result = sqlx::query("DELETE FROM todos WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        debug!(user_id, rows = result.rows_affected(), "todos cleared");
        Ok(true)
    }
}
