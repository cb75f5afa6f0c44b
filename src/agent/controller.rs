//! Agent Controller - orchestration loop for one natural-language instruction
//!
//! The AgentController sends the instruction to the model together with the
//! todo tools, runs every tool call the model asks for against the caller's
//! todos and feeds the results back until the model answers in plain text.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::prompt::system_prompt;
use super::session::SessionContext;
use crate::llm::{ChatError, ChatMessage, ChatModel};
use crate::metrics::{AGENT_ITERATIONS, LLM_CALL_DURATION};
use crate::store::StoreError;
use crate::tools::ToolBox;

/// Configuration for the agent controller
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of model turns before giving up
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// One instruction from an authenticated caller
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    /// Validated caller id; every tool call is scoped to it
    pub user_id: String,
    pub session: SessionContext,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            user_id: user_id.into(),
            session: SessionContext::default(),
        }
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }
}

/// Result of an agent run
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Final answer from the model
    pub final_response: String,
    /// Number of model turns made
    pub iterations: usize,
    /// Every tool call executed, in order
    pub invocations: Vec<ToolInvocation>,
    /// Unique trace ID for this agent run
    pub trace_id: String,
}

/// Record of a single tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    /// Arguments exactly as the model sent them
    pub arguments: String,
    /// Whether the tool returned `{ok}` rather than `{error}`
    pub ok: bool,
}

/// Error type for agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("maximum of {0} model turns reached without a final answer")]
    MaxIterationsReached(usize),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Agent Controller binding a chat model to the todo tools
pub struct AgentController {
    model: Arc<dyn ChatModel>,
    tools: ToolBox,
    config: AgentConfig,
}

impl AgentController {
    /// Create a new agent controller
    ///
    /// # Arguments
    /// * `model` - Chat model that decides which tools to call
    /// * `tools` - Todo tools bound to a store
    /// * `config` - Agent configuration
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolBox, config: AgentConfig) -> Self {
        Self {
            model,
            tools,
            config,
        }
    }

    /// Run the agent loop for one instruction
    ///
    /// The caller's `user_id` is written into the system prompt and used for
    /// every tool call; ids appearing in the model's arguments are ignored.
    pub async fn run(&self, request: &AgentRequest) -> Result<AgentResult, AgentError> {
        let trace_id = Uuid::now_v7().to_string();
        let model_name = self.model.model_name().to_string();

        let root_span = info_span!(
            "agent_task",
            trace_id = %trace_id,
            user_id = %request.user_id,
            model = %model_name,
            otel.name = "agent_task"
        );

        async {
            info!(
                trace_id = %trace_id,
                history = request.session.history.len(),
                "Starting agent task"
            );

            let tools = self.tools.definitions();
            let mut messages = vec![
                ChatMessage::system(system_prompt(&request.user_id)),
                ChatMessage::user(
                    request
                        .session
                        .compose_input(&request.user_id, &request.prompt),
                ),
            ];

            let mut iterations = 0;
            let mut invocations = vec![];

            loop {
                iterations += 1;

                if iterations > self.config.max_iterations {
                    warn!(trace_id = %trace_id, iterations, "Max iterations reached");
                    AGENT_ITERATIONS.observe(self.config.max_iterations as f64);
                    return Err(AgentError::MaxIterationsReached(self.config.max_iterations));
                }

                let llm_span = info_span!(
                    "llm_call",
                    trace_id = %trace_id,
                    iteration = iterations,
                    otel.name = "llm_call"
                );

                let call_start = Instant::now();
                let response = self
                    .model
                    .chat(&messages, &tools)
                    .instrument(llm_span)
                    .await?;
                let call_duration = call_start.elapsed();

                LLM_CALL_DURATION
                    .with_label_values(&[&model_name])
                    .observe(call_duration.as_secs_f64());
                info!(
                    trace_id = %trace_id,
                    iteration = iterations,
                    duration_ms = call_duration.as_secs_f64() * 1000.0,
                    "LLM call completed"
                );

                let tool_calls = response.tool_calls().to_vec();

                if tool_calls.is_empty() {
                    info!(
                        trace_id = %trace_id,
                        iterations,
                        tool_calls = invocations.len(),
                        "Agent task completed"
                    );
                    AGENT_ITERATIONS.observe(iterations as f64);

                    return Ok(AgentResult {
                        final_response: response.final_text(),
                        iterations,
                        invocations,
                        trace_id: trace_id.clone(),
                    });
                }

                if let Some(message) = response.message {
                    messages.push(message);
                }

                for tool_call in tool_calls {
                    let tool_span = info_span!(
                        "tool_call",
                        trace_id = %trace_id,
                        tool = %tool_call.function.name,
                        otel.name = "tool_call"
                    );

                    let outcome = self
                        .tools
                        .dispatch(&request.user_id, &tool_call.function)
                        .instrument(tool_span)
                        .await?;

                    info!(
                        trace_id = %trace_id,
                        tool = %tool_call.function.name,
                        ok = outcome.is_ok(),
                        "Tool call finished"
                    );

                    invocations.push(ToolInvocation {
                        tool: tool_call.function.name.clone(),
                        arguments: tool_call.function.arguments.clone(),
                        ok: outcome.is_ok(),
                    });
                    messages.push(ChatMessage::tool(tool_call.id, outcome.to_content()));
                }
            }
        }
        .instrument(root_span)
        .await
    }
}
