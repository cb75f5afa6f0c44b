//! todo-agent - natural-language todo management backed by a tool-calling LLM
//!
//! A caller sends an instruction ("add buy milk", "mark buy milk done") along
//! with their user id. The agent hands it to a hosted chat model together with
//! five todo tools, executes whatever calls the model makes against that
//! user's todos only, and returns the model's final reply.
//!
//! # Modules
//!
//! - `store` - Per-user todo persistence (Postgres or in-memory)
//! - `tools` - Tool schemas, argument parsing and dispatch
//! - `llm` - OpenAI-compatible chat client with tool calling
//! - `agent` - The tool-use loop, system prompt and session context
//! - `server` - axum routes for `/ask` and the direct `/api/todos` CRUD
//! - `config` - Environment configuration
//! - `metrics` - Prometheus metrics for observability
//! - `tracing` - Logging and optional OTLP trace export
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use todo_agent::{AgentController, AgentConfig, AgentRequest, InMemoryTodoStore, ToolBox};
//!
//! let store = Arc::new(InMemoryTodoStore::new());
//! let agent = AgentController::new(model, ToolBox::new(store), AgentConfig::default());
//! let result = agent.run(&AgentRequest::new("add buy milk", "user-1")).await?;
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod metrics;
pub mod server;
pub mod store;
pub mod tools;
pub mod tracing;

// Re-export commonly used types at crate root for convenience
pub use agent::{AgentConfig, AgentController, AgentRequest, AgentResult};
pub use config::AppConfig;
pub use store::{InMemoryTodoStore, PgTodoStore, Todo, TodoStore};
pub use tools::ToolBox;
