//! Agent Core — tool-calling agents for Airspace Copilot.
//!
//! Submodules:
//! - `agent_loop`: Two-round protocol (ask with tools, run tools, ask again)
//! - `conversation`: Per-request message list
//! - `roles`: Traveler and Ops personas (prompt + tool allow-list)
//! - `orchestrator`: Traveler + Ops + synthesis composition
//! - `errors`: Agent-level error types

pub mod agent_loop;
pub mod conversation;
pub mod errors;
pub mod orchestrator;
pub mod roles;

// Re-exports for convenience
pub use agent_loop::{AgentAnswer, AgentLoop, LoopSettings, LoopStage};
pub use conversation::Conversation;
pub use errors::{AgentError, PipelineStage};
pub use orchestrator::{CoordinatedAnswer, Orchestrator};
pub use roles::{ops_sitrep_question, traveler_question, AgentRole};
