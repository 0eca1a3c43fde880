//! Graph execution error types.
//!
//! Used by graph nodes, the compiled graph runner, and the LLM clients.

use thiserror::Error;

/// Error from running a graph or one of its nodes.
///
/// Model transport failures, tool plumbing failures, and runner-level
/// problems all map to `ExecutionFailed` with a message; the tool loop
/// ceiling gets its own variant because callers treat it as fatal rather
/// than retryable.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, bad graph wiring).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The generate/execute tool cycle hit its round ceiling without the
    /// model producing a final answer.
    #[error("tool loop exceeded {rounds} rounds without a final answer")]
    ToolLoopExceeded { rounds: usize },
}
