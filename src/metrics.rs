//! Prometheus metrics for the todo agent
//!
//! All metrics live in the default registry and are exported by
//! `GET /metrics` through [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};

lazy_static! {
    // ─────────────────────────────────────────────────────────────────────────────
    // Request Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// `/ask` requests by outcome.
    ///
    /// Labels:
    /// - status: "ok", "bad_request" or "error"
    pub static ref ASK_REQUESTS: CounterVec = register_counter_vec!(
        "todo_agent_ask_requests_total",
        "Natural-language requests handled by /ask",
        &["status"]
    ).expect("failed to register ASK_REQUESTS metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Agent Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Wall time of each chat-completion round trip.
    pub static ref LLM_CALL_DURATION: HistogramVec = register_histogram_vec!(
        "todo_agent_llm_call_duration_seconds",
        "Duration of chat-completion calls to the model provider",
        &["model"],
        vec![0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0]
    ).expect("failed to register LLM_CALL_DURATION metric");

    /// Model turns needed to produce a final answer.
    pub static ref AGENT_ITERATIONS: Histogram = register_histogram!(
        "todo_agent_agent_iterations",
        "Model turns per agent run",
        vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 10.0]
    ).expect("failed to register AGENT_ITERATIONS metric");

    /// Tool invocations made on behalf of the model.
    ///
    /// Labels:
    /// - tool: tool name as sent by the model
    /// - outcome: "ok" or "error"
    pub static ref TOOL_CALLS: CounterVec = register_counter_vec!(
        "todo_agent_tool_calls_total",
        "Tool calls dispatched to the todo store",
        &["tool", "outcome"]
    ).expect("failed to register TOOL_CALLS metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Store Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub static ref STORE_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "todo_agent_store_operation_duration_seconds",
        "Duration of todo store operations",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).expect("failed to register STORE_OPERATION_DURATION metric");
}

/// Render every registered metric in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
