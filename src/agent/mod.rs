//! Agent module for natural-language todo management
//!
//! This module provides the agent loop that orchestrates:
//! - A hosted chat model with tool calling
//! - The five todo tools
//! - A per-user todo store
//!
//! # Architecture
//!
//! ```text
//! Instruction + user_id → AgentController → model (system prompt + tools)
//!                              ↓
//!                   Tool Call: add_todo / update_todo / ...
//!                              ↓
//!                   ToolBox.dispatch(user_id) → TodoStore
//!                              ↓
//!                   {"ok": ...} | {"error": ...}
//!                              ↓
//!                   Feed result back to model → Loop or Final answer
//! ```
//!
//! Each run starts from scratch; history and the action log arrive with the
//! request in a [`SessionContext`].

pub mod controller;
pub mod prompt;
pub mod session;

pub use controller::{
    AgentConfig, AgentController, AgentError, AgentRequest, AgentResult, ToolInvocation,
};
pub use prompt::system_prompt;
pub use session::{ActionRecord, HistoryMessage, SessionContext};
