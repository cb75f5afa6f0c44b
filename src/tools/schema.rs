//! Tool definitions advertised to the model
//!
//! Every schema accepts an optional `user_id` so models that insist on passing
//! one are not rejected, but the dispatcher always substitutes the caller's id.

use serde_json::json;

use crate::llm::Tool;

pub const FETCH_TODOS: &str = "fetch_todos";
pub const ADD_TODO: &str = "add_todo";
pub const UPDATE_TODO: &str = "update_todo";
pub const DELETE_TODO: &str = "delete_todo";
pub const DELETE_ALL_TODOS: &str = "delete_all_todos";

fn user_id_property() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "The user_id from CONTEXT. Never invent or change it."
    })
}

/// The five todo tools, in the order they are offered
pub fn todo_tools() -> Vec<Tool> {
    vec![
        Tool::function(
            FETCH_TODOS,
            "Fetch all todos for the current user, newest first.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": user_id_property()
                }
            }),
        ),
        Tool::function(
            ADD_TODO,
            "Add a new todo for the current user with an optional description and completion status.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": user_id_property(),
                    "title": {"type": "string", "description": "Title of the new todo"},
                    "description": {"type": "string", "description": "Optional longer description"},
                    "completed": {"type": "boolean", "description": "Initial status, defaults to false"}
                },
                "required": ["title"]
            }),
        ),
        Tool::function(
            UPDATE_TODO,
            "Update an existing todo's title, description, or status. Identify it by todo_id or current_title.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": user_id_property(),
                    "todo_id": {"type": "integer", "description": "Id of the todo to update"},
                    "current_title": {"type": "string", "description": "Exact current title, used when no id is known"},
                    "title": {"type": "string", "description": "New title"},
                    "description": {"type": "string", "description": "New description"},
                    "completed": {"type": "boolean", "description": "New completion status"}
                }
            }),
        ),
        Tool::function(
            DELETE_TODO,
            "Delete a todo by id, title, or description (title and description match case-insensitively).",
            json!({
                "type": "object",
                "properties": {
                    "user_id": user_id_property(),
                    "todo_id": {"type": "integer", "description": "Id of the todo to delete"},
                    "title": {"type": "string", "description": "Title of the todo to delete"},
                    "description": {"type": "string", "description": "Description of the todo to delete"}
                }
            }),
        ),
        Tool::function(
            DELETE_ALL_TODOS,
            "Delete ALL todos for the current user.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": user_id_property()
                }
            }),
        ),
    ]
}
