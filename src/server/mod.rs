//! HTTP surface for the todo agent
//!
//! | Route                         | Handler                |
//! |-------------------------------|------------------------|
//! | `POST /ask`                   | natural-language agent |
//! | `GET/POST/DELETE /api/todos`  | list / create / clear  |
//! | `PUT/DELETE /api/todos/:id`   | update / delete        |
//! | `PATCH /api/todos/:id/toggle` | set completion         |
//! | `GET /health`                 | liveness               |
//! | `GET /metrics`                | Prometheus scrape      |

pub mod ask;
pub mod error;
pub mod todos;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::agent::AgentController;
use crate::config::CorsConfig;
use crate::metrics;
use crate::store::TodoStore;

pub use ask::{AskRequest, AskResponse, FALLBACK_REPLY};
pub use error::ApiError;
pub use todos::USER_ID_HEADER;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentController>,
    pub store: Arc<dyn TodoStore>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub store: &'static str,
}

/// Create the application router
pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/ask", post(ask::ask))
        .route(
            "/api/todos",
            get(todos::list_todos)
                .post(todos::create_todo)
                .delete(todos::delete_all_todos),
        )
        .route(
            "/api/todos/:id",
            put(todos::update_todo).delete(todos::delete_todo),
        )
        .route("/api/todos/:id/toggle", patch(todos::toggle_todo))
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors.to_layer())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        store: state.store.backend(),
    })
}

async fn prometheus_metrics() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
