//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// A suspension point in one request. Deadlines are checked per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// First completion call (tools offered).
    FirstCompletion,
    /// Execution of the requested tool calls.
    ToolExecution,
    /// Second completion call (no tools).
    FinalCompletion,
    /// Orchestrator synthesis call.
    Synthesis,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineStage::FirstCompletion => "first completion",
            PipelineStage::ToolExecution => "tool execution",
            PipelineStage::FinalCompletion => "final completion",
            PipelineStage::Synthesis => "synthesis",
        };
        f.write_str(s)
    }
}

/// Errors that abort an agent invocation.
///
/// Tool failures are not here: they are reported to the model as results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The completion service failed. Not retried.
    #[error("completion service error: {0}")]
    Inference(#[from] InferenceError),

    /// The request deadline passed while waiting on `stage`.
    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: PipelineStage },
}
