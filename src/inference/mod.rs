//! Inference Client — OpenAI-compatible chat-completions client with tool calling.
//!
//! This module handles all communication with the completion service:
//! - Request building (messages, tool schemas, `tool_choice`)
//! - Response parsing into text and tool-call requests
//! - The [`CompletionService`] seam the agent loop is written against
//!
//! The client speaks the OpenAI Chat Completions API, so the hosted model is
//! interchangeable via config.

pub mod client;
pub mod errors;
pub mod response;
pub mod types;

// Re-exports for convenience
pub use client::{CompletionService, InferenceClient};
pub use errors::InferenceError;
pub use types::{
    ChatMessage, Completion, CompletionRequest, Role, ToolArguments, ToolCall, ToolChoice,
    ToolDefinition,
};
