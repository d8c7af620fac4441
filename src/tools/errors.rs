//! Tool layer error types.

use thiserror::Error;

use crate::flight_data::FlightDataError;

/// Errors raised while resolving or executing a tool call.
///
/// Inside the agent loop every variant is converted into an `{"error": …}`
/// tool result; direct callers of the tool layer receive them as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// The name is not a registered tool.
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// The tool exists but is outside the active allow-list.
    #[error("Tool {name} is not allowed for this agent.")]
    NotAllowedTool { name: String },

    /// Arguments did not match the tool's parameter schema.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The snapshot fetch failed.
    #[error(transparent)]
    Data(#[from] FlightDataError),

    /// A tool result could not be encoded as JSON.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Serialization {
            reason: e.to_string(),
        }
    }
}
