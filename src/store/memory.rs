//! In-process todo store
//!
//! Mirrors the Postgres semantics closely enough to run the agent and the HTTP
//! surface without a database: monotonically increasing ids that are never
//! reused, newest-first listing and case-insensitive delete matching.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{DeleteTarget, NewTodo, StoreError, Todo, TodoPatch, TodoSelector, TodoStore};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: Vec<Todo>,
}

/// Todo store held entirely in memory
#[derive(Default)]
pub struct InMemoryTodoStore {
    table: Mutex<Table>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        // A panic while holding the lock cannot leave a row half-written.
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Table {
    fn position(&self, user_id: &str, selector: &TodoSelector) -> Option<usize> {
        match selector {
            TodoSelector::Id(id) => self
                .rows
                .iter()
                .position(|t| t.id == *id && t.user_id == user_id),
            TodoSelector::Title(title) => self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, t)| t.user_id == user_id && t.title == *title)
                .min_by_key(|(_, t)| t.id)
                .map(|(i, _)| i),
        }
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Todo>, StoreError> {
        let table = self.table();
        let mut todos: Vec<Todo> = table
            .rows
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(todos)
    }

    async fn create(&self, user_id: &str, todo: NewTodo) -> Result<Todo, StoreError> {
        let todo = todo.validated()?;
        let mut table = self.table();
        table.last_id += 1;
        let now = Utc::now();
        let created = Todo {
            id: table.last_id,
            user_id: user_id.to_string(),
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        user_id: &str,
        selector: TodoSelector,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let patch = patch.validated()?;
        let mut table = self.table();
        let Some(index) = table.position(user_id, &selector) else {
            return Ok(None);
        };

        let row = &mut table.rows[index];
        if patch.is_empty() {
            return Ok(Some(row.clone()));
        }

        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(description) = patch.description {
            row.description = Some(description);
        }
        if let Some(completed) = patch.completed {
            row.completed = completed;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, user_id: &str, target: DeleteTarget) -> Result<bool, StoreError> {
        let mut table = self.table();
        let before = table.rows.len();
        table.rows.retain(|t| {
            if t.user_id != user_id {
                return true;
            }
            let hit = match &target {
                DeleteTarget::Id(id) => t.id == *id,
                DeleteTarget::Title(title) => t.title.to_lowercase() == title.to_lowercase(),
                DeleteTarget::Description(description) => t
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase() == description.to_lowercase()),
            };
            !hit
        });
        Ok(table.rows.len() < before)
    }

    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError> {
        self.table().rows.retain(|t| t.user_id != user_id);
        Ok(true)
    }
}
