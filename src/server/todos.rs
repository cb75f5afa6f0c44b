//! Direct todo CRUD under `/api/todos`
//!
//! These routes skip the agent and talk to the store directly. The caller is
//! identified by the `X-User-Id` header and only ever sees their own rows.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiJson};
use super::AppState;
use crate::store::{DeleteTarget, NewTodo, Todo, TodoPatch, TodoSelector};

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from the `X-User-Id` header
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CallerId(value.to_string()))
            .ok_or_else(|| ApiError::BadRequest("X-User-Id header is required".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoBody {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoBody {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Todo not found".to_string())
}

/// GET /api/todos
pub async fn list_todos(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.store.list(&user_id).await?))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    ApiJson(body): ApiJson<CreateTodoBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title is required and must be a non-empty string".to_string(),
        ));
    }

    let mut todo = NewTodo::new(body.title);
    if let Some(description) = body.description.filter(|d| !d.trim().is_empty()) {
        todo = todo.with_description(description.trim());
    }

    let created = state.store.create(&user_id, todo).await?;
    tracing::debug!(user_id = %user_id, todo_id = created.id, "todo created via REST");
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/todos
pub async fn delete_all_todos(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Result<Json<MessageBody>, ApiError> {
    state.store.delete_all(&user_id).await?;
    Ok(Json(MessageBody {
        message: "All todos deleted successfully",
    }))
}

/// PUT /api/todos/:id
pub async fn update_todo(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateTodoBody>,
) -> Result<Json<Todo>, ApiError> {
    let patch = TodoPatch {
        title: body.title,
        description: body.description,
        completed: None,
    };
    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one of title or description must be provided".to_string(),
        ));
    }

    state
        .store
        .update(&user_id, TodoSelector::Id(id), patch)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// DELETE /api/todos/:id
pub async fn delete_todo(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&user_id, DeleteTarget::Id(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

/// PATCH /api/todos/:id/toggle
pub async fn toggle_todo(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<ToggleBody>,
) -> Result<Json<Todo>, ApiError> {
    let completed = body
        .completed
        .ok_or_else(|| ApiError::BadRequest("completed must be a boolean".to_string()))?;

    let patch = TodoPatch {
        completed: Some(completed),
        ..TodoPatch::default()
    };

    state
        .store
        .update(&user_id, TodoSelector::Id(id), patch)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
