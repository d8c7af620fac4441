//! Conversation — the message list of one agent invocation.
//!
//! Append-only and request-scoped: it is built from a system and a user
//! message, grows as the loop runs, and is dropped with the answer.

use std::collections::HashSet;

use crate::inference::types::{ChatMessage, Role, ToolCall};
use crate::tools::ToolOutcome;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation with `[system, user]`.
    pub fn new(system_prompt: &str, user_query: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_query)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Record the assistant turn that requested `calls`.
    pub fn push_tool_calls(&mut self, content: Option<String>, calls: &[ToolCall]) {
        self.push(ChatMessage::assistant_tool_calls(content, calls));
    }

    /// Record one tool result, correlated by call id.
    pub fn push_tool_outcome(&mut self, outcome: &ToolOutcome) {
        self.push(outcome.to_message());
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Call ids requested by assistant turns that have no `tool` reply yet.
    pub fn unanswered_call_ids(&self) -> Vec<String> {
        let answered: HashSet<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_calls.iter().flatten())
            .filter(|tc| !answered.contains(tc.id.as_str()))
            .map(|tc| tc.id.clone())
            .collect()
    }
}
