//! Chat completion response parsing.
//!
//! Normalizes a non-streaming OpenAI-compatible response body into a
//! [`Completion`]. Tool-call arguments arrive as JSON-encoded strings and are
//! decoded here; undecodable arguments are preserved as
//! [`ToolArguments::Malformed`] rather than failing the whole response.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::errors::InferenceError;
use super::types::{Completion, ToolArguments, ToolCall};

#[derive(Deserialize)]
struct ResponseBody {
    choices: Vec<ResponseChoice>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    id: Option<String>,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    #[serde(default)]
    name: String,
    /// Normally a JSON-encoded string; some providers send the object itself.
    #[serde(default)]
    arguments: Option<Value>,
}

/// Parse a complete (non-streaming) chat completion body.
pub fn parse_completion_response(body: &str) -> Result<Completion, InferenceError> {
    let resp: ResponseBody = serde_json::from_str(body).map_err(|e| InferenceError::ResponseParse {
        reason: format!("failed to parse completion response: {e}"),
    })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::ResponseParse {
            reason: "empty choices array".into(),
        })?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(parse_tool_call)
        .collect();

    let finish_reason = if tool_calls.is_empty() {
        choice.finish_reason.or_else(|| Some("stop".into()))
    } else {
        Some("tool_calls".into())
    };

    Ok(Completion {
        content: choice.message.content,
        tool_calls,
        finish_reason,
    })
}

/// Convert one wire tool call. Never fails: a blank name or bad arguments
/// are left for the dispatcher to report back to the model.
fn parse_tool_call(tc: ResponseToolCall) -> ToolCall {
    let arguments = match tc.function.arguments {
        None | Some(Value::Null) => decode_arguments(""),
        Some(Value::String(raw)) => decode_arguments(&raw),
        Some(value) => ToolArguments::Parsed(value),
    };

    let id = tc
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4()));

    ToolCall {
        id,
        name: tc.function.name,
        arguments,
    }
}

/// Decode a JSON-encoded argument string. An empty string means `{}`.
pub fn decode_arguments(raw: &str) -> ToolArguments {
    if raw.trim().is_empty() {
        return ToolArguments::Parsed(serde_json::json!({}));
    }
    match serde_json::from_str(raw) {
        Ok(value) => ToolArguments::Parsed(value),
        Err(e) => ToolArguments::Malformed {
            raw: raw.to_string(),
            reason: format!("invalid JSON arguments: {e}"),
        },
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
