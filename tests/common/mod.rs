//! Shared fixtures for integration tests
//!
//! [`ScriptedModel`] stands in for the hosted chat model: it replays a fixed
//! list of turns and records every message list it was sent.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use todo_agent::llm::{
    ChatError, ChatMessage, ChatModel, ChatResponse, FunctionCall, Role, Tool, ToolCall,
};
use todo_agent::store::InMemoryTodoStore;
use todo_agent::{AgentConfig, AgentController, ToolBox};

pub struct ScriptedModel {
    turns: Mutex<VecDeque<ChatResponse>>,
    /// Returned once the script runs out; `None` means fail with EmptyResponse
    repeat: Option<ChatResponse>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<ChatResponse>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that answers every turn with `turn`
    pub fn looping(turn: ChatResponse) -> Self {
        Self {
            repeat: Some(turn),
            ..Self::new(vec![])
        }
    }

    /// Message lists received so far, one per model turn
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    /// Content of the `tool` messages the model was shown, in order
    pub fn tool_results(&self) -> Vec<Value> {
        let requests = self.requests();
        let Some(last) = requests.last() else {
            return vec![];
        };
        last.iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| serde_json::from_str(m.content.as_deref().unwrap_or("null")).unwrap())
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: &[Tool],
    ) -> Result<ChatResponse, ChatError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        match self.turns.lock().unwrap().pop_front() {
            Some(turn) => Ok(turn),
            None => self.repeat.clone().ok_or(ChatError::EmptyResponse),
        }
    }
}

/// One tool call with arguments encoded the way providers send them
pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// An assistant turn that requests `calls`
pub fn tool_turn(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        message: Some(ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }),
        finish_reason: Some("tool_calls".to_string()),
        raw: String::new(),
    }
}

/// A final plain-text assistant turn
pub fn text_turn(text: &str) -> ChatResponse {
    ChatResponse {
        message: Some(ChatMessage::assistant(text)),
        finish_reason: Some("stop".to_string()),
        raw: String::new(),
    }
}

/// Agent wired to a scripted model and a fresh in-memory store
pub fn agent_with(
    model: Arc<ScriptedModel>,
    max_iterations: usize,
) -> (AgentController, Arc<InMemoryTodoStore>) {
    let store = Arc::new(InMemoryTodoStore::new());
    let agent = AgentController::new(
        model,
        ToolBox::new(store.clone()),
        AgentConfig { max_iterations },
    );
    (agent, store)
}
