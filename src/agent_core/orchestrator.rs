//! Traveler + Ops orchestrator.
//!
//! Three phases, run in order on one shared agent loop:
//! 1. **Traveler** answers the passenger's question about their flight
//! 2. **Ops** reports on the region around that flight
//! 3. **Synthesize** one text-only completion that sees both replies verbatim
//!    and writes a single passenger-safe answer
//!
//! A failure in any phase aborts the whole request; there is no partial
//! answer. With no tool use this is exactly three completion calls.

use serde::Serialize;

use crate::inference::types::{ChatMessage, CompletionRequest};

use super::agent_loop::{within, AgentLoop};
use super::errors::{AgentError, PipelineStage};
use super::roles::AgentRole;

const COORDINATOR_PROMPT: &str = "You are a coordinator between a traveler support agent and \
an operations agent. You will see both of their messages and must produce ONE clear answer \
for the passenger. Reassure them when appropriate, but do not hide serious issues.";

/// The three replies of one coordinated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatedAnswer {
    pub traveler_reply: String,
    pub ops_reply: String,
    pub final_answer: String,
}

/// Composes the Traveler and Ops roles plus a synthesis call.
#[derive(Clone)]
pub struct Orchestrator {
    agent: AgentLoop,
}

impl Orchestrator {
    pub fn new(agent: AgentLoop) -> Self {
        Self { agent }
    }

    /// Answer a passenger question about `callsign` with both roles' input.
    pub async fn traveler_with_ops(
        &self,
        callsign: &str,
        passenger_question: &str,
        region: &str,
    ) -> Result<CoordinatedAnswer, AgentError> {
        let deadline = self.agent.deadline_from_now();
        tracing::info!(callsign, region, "coordinated request started");

        let traveler = AgentRole::Traveler;
        let traveler_reply = self
            .agent
            .run_until(
                traveler.system_prompt(),
                &flight_question(callsign, region, passenger_question),
                &traveler.allow_list(),
                deadline,
            )
            .await?
            .content;

        let ops = AgentRole::Ops;
        let ops_reply = self
            .agent
            .run_until(
                ops.system_prompt(),
                &neighborhood_question(callsign, region),
                &ops.allow_list(),
                deadline,
            )
            .await?
            .content;

        let messages = vec![
            ChatMessage::system(COORDINATOR_PROMPT),
            ChatMessage::user(synthesis_prompt(
                callsign,
                passenger_question,
                &traveler_reply,
                &ops_reply,
            )),
        ];
        let final_answer = within(
            deadline,
            PipelineStage::Synthesis,
            self.agent
                .completion_service()
                .complete(CompletionRequest::text_only(messages)),
        )
        .await??
        .content_or_empty();

        tracing::info!(
            callsign,
            traveler_len = traveler_reply.len(),
            ops_len = ops_reply.len(),
            final_len = final_answer.len(),
            "coordinated request finished"
        );

        Ok(CoordinatedAnswer {
            traveler_reply,
            ops_reply,
            final_answer,
        })
    }
}

fn flight_question(callsign: &str, region: &str, question: &str) -> String {
    format!(
        "My flight {callsign} is in {region}. {question} \
         Please use tools to check this specific flight."
    )
}

fn neighborhood_question(callsign: &str, region: &str) -> String {
    format!(
        "Consider flight {callsign} in {region}. Give a short situation report focusing on \
         nearby anomalies and anything that could worry the passenger."
    )
}

fn synthesis_prompt(callsign: &str, question: &str, traveler: &str, ops: &str) -> String {
    format!(
        "Passenger question: {question}\n\
         Flight: {callsign}\n\n\
         Traveler agent said:\n{traveler}\n\n\
         Ops agent said:\n{ops}\n\n\
         Now give a final answer for the passenger."
    )
}
