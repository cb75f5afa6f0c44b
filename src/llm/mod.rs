//! Hosted chat-completion model with tool calling
//!
//! The agent talks to any OpenAI-compatible `/chat/completions` endpoint
//! (OpenRouter by default). [`ChatModel`] is the seam the agent depends on;
//! [`ChatClient`] is the HTTP implementation.

pub mod chat;

pub use chat::{
    ChatClient, ChatError, ChatMessage, ChatModel, ChatResponse, FunctionCall, LlmConfig, Role,
    Tool, ToolCall, ToolFunction,
};
