//! User-scoped todo storage
//!
//! Every operation takes the owning `user_id` as its first argument and never
//! touches rows belonging to anyone else. Two backends implement the same
//! [`TodoStore`] contract:
//!
//! - [`PgTodoStore`] - Postgres via a lazily connected sqlx pool
//! - [`InMemoryTodoStore`] - process-local, for development and tests
//!
//! # Target Resolution
//!
//! ```text
//! update:  id ──► row (if owned)            delete:  id ──────────► rows
//!          └─ else current_title ──► first           └─ else title ─► rows (case-insensitive)
//!             matching row (if owned)                   └─ else description ─► rows
//! ```
//!
//! Only the first supplied selector is used; a selector that matches nothing
//! does not fall through to the next one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryTodoStore;
pub use postgres::PgTodoStore;

/// A single task owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Todo {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a todo about to be created
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Trim the title and reject it if nothing is left.
    pub(crate) fn validated(self) -> Result<Self, StoreError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("title must not be empty".to_string()));
        }
        Ok(Self {
            title: title.to_string(),
            ..self
        })
    }
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Trim a replacement title and reject it if nothing is left.
    pub(crate) fn validated(self) -> Result<Self, StoreError> {
        let title = match self.title {
            Some(title) => {
                let trimmed = title.trim();
                if trimmed.is_empty() {
                    return Err(StoreError::Validation("title must not be empty".to_string()));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        Ok(Self { title, ..self })
    }
}

/// How an update locates its row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoSelector {
    Id(i64),
    /// Exact title match; the lowest id wins when several rows share it
    Title(String),
}

impl TodoSelector {
    /// Pick the selector by priority: id first, then current title.
    pub fn resolve(id: Option<i64>, current_title: Option<String>) -> Option<Self> {
        match (id, current_title) {
            (Some(id), _) => Some(Self::Id(id)),
            (None, Some(title)) => Some(Self::Title(title)),
            (None, None) => None,
        }
    }
}

/// How a delete locates its rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Id(i64),
    /// Case-insensitive exact title match
    Title(String),
    /// Case-insensitive exact description match
    Description(String),
}

impl DeleteTarget {
    /// Pick the target by priority: id, then title, then description.
    pub fn resolve(
        id: Option<i64>,
        title: Option<String>,
        description: Option<String>,
    ) -> Option<Self> {
        if let Some(id) = id {
            Some(Self::Id(id))
        } else if let Some(title) = title {
            Some(Self::Title(title))
        } else {
            description.map(Self::Description)
        }
    }
}

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before reaching the database
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// User-scoped CRUD over the `todos` table
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Short backend name for health output and logs
    fn backend(&self) -> &'static str;

    /// All of the user's todos, newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<Todo>, StoreError>;

    /// Insert a todo; fails with [`StoreError::Validation`] on a blank title.
    async fn create(&self, user_id: &str, todo: NewTodo) -> Result<Todo, StoreError>;

    /// Apply `patch` to the selected row.
    ///
    /// Returns `Ok(None)` when the selector matches no row owned by `user_id`.
    /// An empty patch returns the current row without bumping `updated_at`.
    async fn update(
        &self,
        user_id: &str,
        selector: TodoSelector,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;

    /// Remove the targeted rows; `true` only if at least one row went away.
    async fn delete(&self, user_id: &str, target: DeleteTarget) -> Result<bool, StoreError>;

    /// Remove every row for the user.
    ///
    /// Succeeds even when the user had nothing to delete, unlike [`TodoStore::delete`].
    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError>;
}
