//! `POST /ask` - natural-language instruction endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ApiJson};
use super::AppState;
use crate::agent::{ActionRecord, AgentRequest, HistoryMessage, SessionContext};
use crate::metrics::ASK_REQUESTS;

/// Returned when the model answers with empty text
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't generate a response.";

/// POST /ask request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(default)]
    pub action_history: Vec<ActionRecord>,
}

/// POST /ask response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub reply: String,
}

/// Truncate to at most `max_chars` characters, adding an ellipsis if needed
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

pub async fn ask(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let prompt = req.prompt.trim();
    let user_id = req.user_id.trim();

    info!(
        user_id,
        prompt = %truncate(prompt, 50),
        history_len = req.history.len(),
        actions_len = req.action_history.len(),
        "incoming /ask request"
    );

    if prompt.is_empty() {
        ASK_REQUESTS.with_label_values(&["bad_request"]).inc();
        return Err(ApiError::BadRequest("Empty prompt".to_string()));
    }
    if user_id.is_empty() {
        ASK_REQUESTS.with_label_values(&["bad_request"]).inc();
        return Err(ApiError::BadRequest(
            "User ID is required for security isolation".to_string(),
        ));
    }

    let request = AgentRequest::new(prompt, user_id)
        .with_session(SessionContext::new(req.history, req.action_history));

    let result = match state.agent.run(&request).await {
        Ok(result) => result,
        Err(e) => {
            ASK_REQUESTS.with_label_values(&["error"]).inc();
            return Err(e.into());
        }
    };

    ASK_REQUESTS.with_label_values(&["ok"]).inc();
    info!(
        user_id,
        trace_id = %result.trace_id,
        iterations = result.iterations,
        tool_calls = result.invocations.len(),
        "agent responded"
    );

    let reply = if result.final_response.trim().is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        result.final_response
    };

    Ok(Json(AskResponse { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_request_field_names() {
        let req: AskRequest = serde_json::from_str(
            r#"{"prompt":"hi","userId":"u1","actionHistory":[{"type":"CREATE","details":"d","timestamp":"t"}]}"#,
        )
        .unwrap();
        assert_eq!(req.user_id, "u1");
        assert!(req.history.is_empty());
        assert_eq!(req.action_history.len(), 1);
    }
}
