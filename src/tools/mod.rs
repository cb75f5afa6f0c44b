//! Todo tools exposed to the model
//!
//! Each store operation is a named tool with a JSON schema. Calls coming back
//! from the model are parsed into the [`TodoTool`] tagged union and dispatched
//! against the store with the caller's `user_id`, never one taken from the
//! model's arguments.
//!
//! # Dispatch
//!
//! ```text
//! ToolCall { name, arguments } ──parse──► TodoTool ──invoke(user_id)──► TodoStore
//!        │                                                                │
//!        └── unknown name / bad JSON ──► {"error": ...}     {"ok": ...} ◄─┤
//!                                                         {"error": ...} ◄┘ not found
//! ```
//!
//! Not-found and validation failures are returned as data so the model can
//! explain them. Only database failures surface as `Err`.

pub mod schema;

use std::sync::Arc;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{FunctionCall, Tool};
use crate::metrics::TOOL_CALLS;
use crate::store::{DeleteTarget, NewTodo, StoreError, TodoPatch, TodoSelector, TodoStore};

pub use schema::todo_tools;

pub const UPDATE_NOT_FOUND: &str = "Todo not found or access denied. Direct update failed.";
pub const DELETE_NOT_FOUND: &str = "Todo not found or access denied";
pub const DELETE_ALL_FAILED: &str = "Failed to delete todos or already empty";

/// Uniform result shape handed back to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutcome {
    Ok(serde_json::Value),
    Error(String),
}

impl ToolOutcome {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Error(format!("failed to encode result: {}", e)),
        }
    }

    fn message(text: &str) -> Self {
        Self::Ok(serde_json::json!({ "message": text }))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// JSON text for the `tool` message content
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"error":"unencodable result"}"#.into())
    }
}

/// Why a tool call from the model could not be understood
#[derive(Debug, Error)]
pub enum ToolParseError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AddTodoArgs {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UpdateTodoArgs {
    #[serde(default, deserialize_with = "lenient_id")]
    pub todo_id: Option<i64>,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DeleteTodoArgs {
    #[serde(default, deserialize_with = "lenient_id")]
    pub todo_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Models occasionally quote numeric ids.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(n)) => Ok(Some(n)),
        Some(RawId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawId::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

/// A parsed tool call
#[derive(Debug, Clone, PartialEq)]
pub enum TodoTool {
    FetchTodos,
    AddTodo(AddTodoArgs),
    UpdateTodo(UpdateTodoArgs),
    DeleteTodo(DeleteTodoArgs),
    DeleteAllTodos,
}

impl TodoTool {
    /// Build a tool from its name and decoded argument object
    pub fn from_call(name: &str, arguments: serde_json::Value) -> Result<Self, ToolParseError> {
        fn args<T: for<'de> Deserialize<'de>>(
            name: &str,
            arguments: serde_json::Value,
        ) -> Result<T, ToolParseError> {
            serde_json::from_value(arguments).map_err(|source| ToolParseError::InvalidArguments {
                tool: name.to_string(),
                source,
            })
        }

        match name {
            schema::FETCH_TODOS => Ok(Self::FetchTodos),
            schema::ADD_TODO => Ok(Self::AddTodo(args(name, arguments)?)),
            schema::UPDATE_TODO => Ok(Self::UpdateTodo(args(name, arguments)?)),
            schema::DELETE_TODO => Ok(Self::DeleteTodo(args(name, arguments)?)),
            schema::DELETE_ALL_TODOS => Ok(Self::DeleteAllTodos),
            other => Err(ToolParseError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchTodos => schema::FETCH_TODOS,
            Self::AddTodo(_) => schema::ADD_TODO,
            Self::UpdateTodo(_) => schema::UPDATE_TODO,
            Self::DeleteTodo(_) => schema::DELETE_TODO,
            Self::DeleteAllTodos => schema::DELETE_ALL_TODOS,
        }
    }
}

/// Decode the JSON argument string; blank means no arguments.
pub fn parse_arguments(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

/// Capability table binding the todo tools to a store
#[derive(Clone)]
pub struct ToolBox {
    store: Arc<dyn TodoStore>,
}

impl ToolBox {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    /// Tool definitions to send with every model request
    pub fn definitions(&self) -> Vec<Tool> {
        todo_tools()
    }

    /// Parse and run one call from the model on behalf of `user_id`
    pub async fn dispatch(
        &self,
        user_id: &str,
        call: &FunctionCall,
    ) -> Result<ToolOutcome, StoreError> {
        let arguments = match parse_arguments(&call.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "unparseable tool arguments");
                TOOL_CALLS.with_label_values(&[&call.name, "error"]).inc();
                return Ok(ToolOutcome::Error(format!("arguments are not valid JSON: {}", e)));
            }
        };

        if let Some(claimed) = arguments.get("user_id").and_then(|v| v.as_str()) {
            if claimed != user_id {
                warn!(tool = %call.name, user_id, claimed, "ignoring model-supplied user_id");
            }
        }

        let tool = match TodoTool::from_call(&call.name, arguments) {
            Ok(tool) => tool,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "rejected tool call");
                TOOL_CALLS.with_label_values(&[&call.name, "error"]).inc();
                return Ok(ToolOutcome::Error(e.to_string()));
            }
        };

        let outcome = self.invoke(user_id, tool).await?;
        let label = if outcome.is_ok() { "ok" } else { "error" };
        TOOL_CALLS.with_label_values(&[&call.name, label]).inc();
        Ok(outcome)
    }

    /// Run a parsed tool against the store, scoped to `user_id`
    pub async fn invoke(&self, user_id: &str, tool: TodoTool) -> Result<ToolOutcome, StoreError> {
        debug!(user_id, tool = tool.name(), "invoking tool");

        match tool {
            TodoTool::FetchTodos => {
                let todos = self.store.list(user_id).await?;
                Ok(ToolOutcome::ok(&todos))
            }
            TodoTool::AddTodo(args) => {
                let new = NewTodo {
                    title: args.title,
                    description: args.description,
                    completed: args.completed.unwrap_or(false),
                };
                match self.store.create(user_id, new).await {
                    Ok(todo) => Ok(ToolOutcome::ok(&todo)),
                    Err(StoreError::Validation(msg)) => Ok(ToolOutcome::Error(msg)),
                    Err(e) => Err(e),
                }
            }
            TodoTool::UpdateTodo(args) => {
                let Some(selector) = TodoSelector::resolve(args.todo_id, args.current_title)
                else {
                    return Ok(ToolOutcome::Error(UPDATE_NOT_FOUND.to_string()));
                };
                let patch = TodoPatch {
                    title: args.title,
                    description: args.description,
                    completed: args.completed,
                };
                match self.store.update(user_id, selector, patch).await {
                    Ok(Some(todo)) => Ok(ToolOutcome::ok(&todo)),
                    Ok(None) => Ok(ToolOutcome::Error(UPDATE_NOT_FOUND.to_string())),
                    Err(StoreError::Validation(msg)) => Ok(ToolOutcome::Error(msg)),
                    Err(e) => Err(e),
                }
            }
            TodoTool::DeleteTodo(args) => {
                let Some(target) = DeleteTarget::resolve(args.todo_id, args.title, args.description)
                else {
                    return Ok(ToolOutcome::Error(DELETE_NOT_FOUND.to_string()));
                };
                if self.store.delete(user_id, target).await? {
                    Ok(ToolOutcome::message("Todo deleted successfully"))
                } else {
                    Ok(ToolOutcome::Error(DELETE_NOT_FOUND.to_string()))
                }
            }
            TodoTool::DeleteAllTodos => {
                if self.store.delete_all(user_id).await? {
                    Ok(ToolOutcome::message("All todos deleted successfully"))
                } else {
                    Ok(ToolOutcome::Error(DELETE_ALL_FAILED.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_shapes() {
        let ok = ToolOutcome::Ok(json!([1, 2]));
        assert_eq!(ok.to_content(), r#"{"ok":[1,2]}"#);
        let err = ToolOutcome::Error("nope".into());
        assert_eq!(err.to_content(), r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_parse_add_todo() {
        let tool = TodoTool::from_call(
            "add_todo",
            json!({"user_id": "u1", "title": "Buy milk", "completed": true}),
        )
        .unwrap();
        match tool {
            TodoTool::AddTodo(args) => {
                assert_eq!(args.title, "Buy milk");
                assert_eq!(args.completed, Some(true));
                assert_eq!(args.description, None);
            }
            other => panic!("unexpected tool {:?}", other),
        }
    }

    #[test]
    fn test_quoted_todo_id_is_accepted() {
        let tool = TodoTool::from_call("delete_todo", json!({"todo_id": "7"})).unwrap();
        assert_eq!(
            tool,
            TodoTool::DeleteTodo(DeleteTodoArgs {
                todo_id: Some(7),
                ..DeleteTodoArgs::default()
            })
        );
    }

    #[test]
    fn test_add_todo_without_title_is_invalid() {
        let err = TodoTool::from_call("add_todo", json!({})).unwrap_err();
        assert!(matches!(err, ToolParseError::InvalidArguments { .. }));
    }

    #[test]
    fn test_unknown_tool() {
        let err = TodoTool::from_call("drop_tables", json!({})).unwrap_err();
        assert!(matches!(err, ToolParseError::UnknownTool(name) if name == "drop_tables"));
    }

    #[test]
    fn test_blank_arguments_mean_empty_object() {
        assert_eq!(parse_arguments("").unwrap(), json!({}));
        assert_eq!(parse_arguments(" {\"a\":1} ").unwrap(), json!({"a": 1}));
    }
}
