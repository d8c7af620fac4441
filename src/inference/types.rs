//! Shared types for the inference client.
//!
//! These mirror the OpenAI Chat Completions API types, used for both
//! request building and response parsing.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the conversation.
///
/// - `content` is serialized as `""` (not `null`) for assistant messages that
///   only carry tool calls.
/// - `tool_call_id`, `name` and `tool_calls` are skipped when `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(serialize_with = "serialize_content")]
    pub content: Option<String>,
    /// Tool results are sent back as `tool` role messages keyed by call id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name on `tool` role messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Assistant messages may contain tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// An assistant turn that requested tools. Arguments are re-encoded as the
    /// JSON strings the API expects.
    pub fn assistant_tool_calls(content: Option<String>, calls: &[ToolCall]) -> Self {
        let tool_calls = calls
            .iter()
            .map(|tc| ToolCallResponse {
                id: tc.id.clone(),
                r#type: "function".to_string(),
                function: FunctionCallResponse {
                    name: tc.name.clone(),
                    arguments: tc.arguments.to_string(),
                },
            })
            .collect();

        Self {
            role: Role::Assistant,
            content,
            tool_call_id: None,
            name: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// A `tool` role message carrying one serialized tool result.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_call_id: Some(call_id.into()),
            name: Some(tool_name.into()),
            tool_calls: None,
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }
}

fn serialize_content<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(s) => serializer.serialize_str(s),
        None => serializer.serialize_str(""),
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool definition sent in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

/// Function definition within a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// How the model may use the supplied tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

/// A provider-agnostic completion request.
///
/// The client fills in model name and sampling parameters from config.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// `None` forces a natural-language answer.
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    /// A request offering `tools` with `tool_choice=auto`.
    ///
    /// An empty tool list is sent as no tools at all; the API rejects `[]`.
    pub fn with_tools(messages: Vec<ChatMessage>, tools: Vec<ToolDefinition>) -> Self {
        if tools.is_empty() {
            return Self::text_only(messages);
        }
        Self {
            messages,
            tools: Some(tools),
            tool_choice: Some(ToolChoice::Auto),
        }
    }

    /// A request with no tool schema.
    pub fn text_only(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: None,
            tool_choice: None,
        }
    }
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// A parsed tool call extracted from the model's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the call with its `tool` role result message.
    pub id: String,
    pub name: String,
    /// Decoded JSON arguments.
    pub arguments: ToolArguments,
}

/// Decoded tool-call arguments.
///
/// The model occasionally emits argument strings that are not JSON. Those are
/// kept as `Malformed` so the agent loop can answer the call with an error
/// result instead of failing the whole completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Parsed(serde_json::Value),
    Malformed { raw: String, reason: String },
}

impl std::fmt::Display for ToolArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolArguments::Parsed(v) => write!(f, "{v}"),
            ToolArguments::Malformed { raw, .. } => f.write_str(raw),
        }
    }
}

impl From<serde_json::Value> for ToolArguments {
    fn from(value: serde_json::Value) -> Self {
        ToolArguments::Parsed(value)
    }
}

/// Tool call as returned in the OpenAI response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub id: String,
    pub r#type: String,
    pub function: FunctionCallResponse,
}

/// Function call details in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub name: String,
    pub arguments: String,
}

/// One completion from the service: free text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

impl Completion {
    /// A plain-text completion.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// A completion requesting tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: calls,
            finish_reason: Some("tool_calls".to_string()),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, `""` when the model returned none.
    pub fn content_or_empty(&self) -> String {
        self.content.clone().unwrap_or_default()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tools_omitted_when_none() {
        let req = ChatCompletionRequest {
            model: "test".to_string(),
            messages: vec![],
            tools: None,
            tool_choice: None,
            temperature: 0.2,
            max_tokens: 1024,
            stream: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("tools"));
        assert!(!json.contains("tool_choice"));
    }

    #[test]
    fn test_tool_choice_serializes_lowercase() {
        let req = ChatCompletionRequest {
            model: "test".to_string(),
            messages: vec![],
            tools: Some(vec![]),
            tool_choice: Some(ToolChoice::Auto),
            temperature: 0.2,
            max_tokens: 1024,
            stream: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"tool_choice\":\"auto\""));
    }

    #[test]
    fn test_assistant_tool_call_message_has_empty_content() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "alerts_list_active".to_string(),
            arguments: json!({"region": "region1"}).into(),
        };
        let msg = ChatMessage::assistant_tool_calls(None, &[call]);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "");
        assert_eq!(value["tool_calls"][0]["id"], "call_1");
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(
            value["tool_calls"][0]["function"]["arguments"],
            "{\"region\":\"region1\"}"
        );
    }

    #[test]
    fn test_tool_result_message_carries_call_id_and_name() {
        let msg = ChatMessage::tool_result("call_7", "flights_get_by_callsign", "{}");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_7");
        assert_eq!(value["name"], "flights_get_by_callsign");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_with_empty_tools_degrades_to_text_only() {
        let req = CompletionRequest::with_tools(vec![ChatMessage::user("hi")], vec![]);
        assert!(req.tools.is_none());
        assert!(req.tool_choice.is_none());
    }

    #[test]
    fn test_content_or_empty() {
        assert_eq!(Completion::default().content_or_empty(), "");
        assert_eq!(Completion::text("ok").content_or_empty(), "ok");
    }
}
