//! OpenAI-compatible chat API with tool calling support
//!
//! This module provides a client for the `/chat/completions` endpoint exposed
//! by OpenRouter, OpenAI and compatible providers. Requests are single
//! non-streaming round trips.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Set on `tool` messages to pair the result with its call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Result of a tool call, answering the call with `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text(Role::Tool, content)
        }
    }

    /// Tool calls requested by the model, if any
    pub fn requested_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// A tool call from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(deserialize_with = "arguments_as_string", default)]
    pub arguments: String,
}

/// Tool definition for the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String, // Always "function"
    pub function: ToolFunction,
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: function_type(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value, // JSON Schema
}

fn function_type() -> String {
    "function".to_string()
}

/// Providers disagree on whether arguments arrive as a JSON string or an object.
fn arguments_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Response from /chat/completions
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// First choice's message, when the provider returned one
    pub message: Option<ChatMessage>,
    pub finish_reason: Option<String>,
    /// Body exactly as received
    pub raw: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl ChatResponse {
    /// Interpret a successful response body
    pub fn from_body(raw: String) -> Result<Self, ChatError> {
        if raw.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        let value: serde_json::Value = serde_json::from_str(&raw)?;

        // OpenRouter reports some upstream failures inside a 200 body.
        if value.get("choices").is_none() {
            if let Some(message) = value["error"]["message"].as_str() {
                return Err(ChatError::Api {
                    status: value["error"]["code"]
                        .as_u64()
                        .and_then(|c| u16::try_from(c).ok())
                        .unwrap_or(502),
                    message: message.to_string(),
                });
            }
        }

        let choice = value
            .get("choices")
            .and_then(|c| c.get(0))
            .cloned()
            .and_then(|c| serde_json::from_value::<Choice>(c).ok());

        Ok(match choice {
            Some(choice) => Self {
                message: Some(choice.message),
                finish_reason: choice.finish_reason,
                raw,
            },
            None => Self {
                message: None,
                finish_reason: None,
                raw,
            },
        })
    }

    /// Tool calls requested in this turn
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message
            .as_ref()
            .map(ChatMessage::requested_calls)
            .unwrap_or_default()
    }

    /// The model's answer as text; falls back to the raw body when the
    /// response carries no message content.
    pub fn final_text(&self) -> String {
        match self.message.as_ref().and_then(|m| m.content.as_ref()) {
            Some(content) => content.clone(),
            None => self.raw.clone(),
        }
    }
}

/// Error type for chat operations
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("empty response from model provider")]
    EmptyResponse,
}

/// Anything that can answer a conversation, optionally calling tools
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier used for logs and metrics
    fn model_name(&self) -> &str;

    /// Send the conversation and return the model's next turn
    async fn chat(&self, messages: &[ChatMessage], tools: &[Tool])
        -> Result<ChatResponse, ChatError>;
}

/// Connection settings for the model provider
#[derive(Clone)]
pub struct LlmConfig {
    /// Base URL up to and including the version segment, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Client for an OpenAI-compatible /chat/completions endpoint
#[derive(Clone)]
pub struct ChatClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl ChatClient {
    /// Create a new chat client
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Send a chat request with optional tools
    ///
    /// # Arguments
    /// * `messages` - The conversation so far
    /// * `tools` - Tools the model may call; omitted from the request when empty
    ///
    /// # Returns
    /// ChatResponse containing the model's reply and any tool calls
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
    ) -> Result<ChatResponse, ChatError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            tools: (!tools.is_empty()).then_some(tools),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        ChatResponse::from_body(text)
    }
}
