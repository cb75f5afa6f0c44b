//! Per-request conversation context
//!
//! The client owns the session: it sends the transcript so far and a log of
//! actions already taken with every request. Nothing here is kept between
//! requests.

use serde::{Deserialize, Serialize};

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// "user" for the human; any other value is treated as the assistant
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub text: String,
}

impl HistoryMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            text: text.into(),
        }
    }

    fn speaker(&self) -> &'static str {
        if self.role == "user" {
            "User"
        } else {
            "Assistant"
        }
    }
}

/// An action the client recorded earlier in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub timestamp: String,
}

/// History and action log accompanying one instruction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub history: Vec<HistoryMessage>,
    pub actions: Vec<ActionRecord>,
}

impl SessionContext {
    pub fn new(history: Vec<HistoryMessage>, actions: Vec<ActionRecord>) -> Self {
        Self { history, actions }
    }

    /// Compose the user turn sent to the model
    ///
    /// ```text
    /// [CONTEXT: user_id='u1']
    ///
    /// Conversation History:
    /// User: ...
    /// Assistant: ...
    ///
    /// Recent Actions in Session:
    /// - CREATE: Added "Buy milk" (10:42)
    ///
    /// New User Message: <prompt>
    /// ```
    pub fn compose_input(&self, user_id: &str, prompt: &str) -> String {
        let mut input = format!("[CONTEXT: user_id='{}']", user_id);

        if !self.history.is_empty() {
            input.push_str("\n\nConversation History:\n");
            for msg in &self.history {
                input.push_str(&format!("{}: {}\n", msg.speaker(), msg.text));
            }
        }

        if !self.actions.is_empty() {
            input.push_str("\n\nRecent Actions in Session:\n");
            let lines: Vec<String> = self
                .actions
                .iter()
                .map(|a| format!("- {}: {} ({})", a.kind, a.details, a.timestamp))
                .collect();
            input.push_str(&lines.join("\n"));
        }

        input.push_str("\n\nNew User Message: ");
        input.push_str(prompt);
        input
    }
}
