//! Agent roles — a system prompt plus a tool allow-list over the shared loop.

use crate::tools::{AllowList, ToolId};

use super::agent_loop::{AgentAnswer, AgentLoop};
use super::errors::AgentError;

const TRAVELER_PROMPT: &str = "You are a traveler support assistant. \
Help passengers understand where their flight is, its altitude, speed, \
and whether anything looks unusual. \
Use the flights_get_by_callsign tool when needed.";

const OPS_PROMPT: &str = "You are an airline operations specialist monitoring airspace safety. \
Use flights_list_region_snapshot and alerts_list_active to analyze current traffic, \
highlight anomalies, and propose actions.";

/// A persona the agent loop can be run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    /// Passenger support for one flight. Callsign lookup only.
    Traveler,
    /// Regional situational awareness. Snapshot and anomaly tools.
    Ops,
}

impl AgentRole {
    pub fn name(self) -> &'static str {
        match self {
            AgentRole::Traveler => "traveler",
            AgentRole::Ops => "ops",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            AgentRole::Traveler => TRAVELER_PROMPT,
            AgentRole::Ops => OPS_PROMPT,
        }
    }

    pub fn allow_list(self) -> AllowList {
        match self {
            AgentRole::Traveler => AllowList::only([ToolId::FlightsGetByCallsign]),
            AgentRole::Ops => {
                AllowList::only([ToolId::FlightsListRegionSnapshot, ToolId::AlertsListActive])
            }
        }
    }

    /// Run one invocation of `agent` as this role.
    pub async fn ask(self, agent: &AgentLoop, question: &str) -> Result<AgentAnswer, AgentError> {
        tracing::info!(role = self.name(), "agent role invoked");
        agent
            .run(self.system_prompt(), question, &self.allow_list())
            .await
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A passenger question scoped to one flight.
pub fn traveler_question(callsign: &str, region: &str, question: &str) -> String {
    format!("My flight {callsign} is in {region}. {question} Please use tools if needed.")
}

/// The standing situation-report request for the Ops role.
pub fn ops_sitrep_question(region: &str) -> String {
    format!(
        "Give me a concise situation report for {region}. \
         Summarize traffic levels and any anomalies, and highlight the most critical flight."
    )
}
