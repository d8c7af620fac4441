//! Tool registry — schemas, allow-lists and dispatch for the flight tools.
//!
//! The tool set is closed: [`ToolId`] enumerates every tool, and each id maps
//! to a typed argument struct and a [`FlightTools`] method. Model-supplied
//! names are resolved once, up front; an unknown name fails with
//! [`ToolError::UnknownTool`] before anything runs.
//!
//! [`ToolRegistry::dispatch`] never fails. Every outcome, including policy
//! rejections and fetch errors, comes back as a JSON payload the agent loop
//! can hand to the model.

use std::collections::BTreeSet;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::inference::types::{ChatMessage, FunctionDefinition, ToolArguments, ToolCall, ToolDefinition};

use super::errors::ToolError;
use super::handlers::FlightTools;

// ─── ToolId ─────────────────────────────────────────────────────────────────

/// Every tool the registry knows, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    FlightsListRegionSnapshot,
    FlightsGetByCallsign,
    AlertsListActive,
}

impl ToolId {
    pub const ALL: [ToolId; 3] = [
        ToolId::FlightsListRegionSnapshot,
        ToolId::FlightsGetByCallsign,
        ToolId::AlertsListActive,
    ];

    /// Wire name exposed to the model.
    pub fn name(self) -> &'static str {
        match self {
            ToolId::FlightsListRegionSnapshot => "flights_list_region_snapshot",
            ToolId::FlightsGetByCallsign => "flights_get_by_callsign",
            ToolId::AlertsListActive => "alerts_list_active",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ToolError> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    fn description(self) -> &'static str {
        match self {
            ToolId::FlightsListRegionSnapshot => {
                "Get the latest cached snapshot of all flights for a region."
            }
            ToolId::FlightsGetByCallsign => {
                "Look up a single flight by callsign in the latest snapshot."
            }
            ToolId::AlertsListActive => {
                "List flights in a region that look anomalous (low speed at cruise altitude, \
                 very high climb/descent rate)."
            }
        }
    }

    fn parameters(self, default_region: &str) -> Value {
        let region = json!({
            "type": "string",
            "description": format!("Region identifier, default '{default_region}'."),
            "default": default_region,
        });

        match self {
            ToolId::FlightsListRegionSnapshot | ToolId::AlertsListActive => json!({
                "type": "object",
                "properties": { "region": region },
                "required": [],
            }),
            ToolId::FlightsGetByCallsign => json!({
                "type": "object",
                "properties": {
                    "callsign": {
                        "type": "string",
                        "description": "Flight callsign, e.g. 'PIA293'.",
                    },
                    "region": region,
                },
                "required": ["callsign"],
            }),
        }
    }

    /// OpenAI-style function schema for this tool.
    pub fn definition(self, default_region: &str) -> ToolDefinition {
        ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters(default_region),
            },
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ─── AllowList ──────────────────────────────────────────────────────────────

/// The tools one agent invocation may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    All,
    Only(BTreeSet<ToolId>),
}

impl AllowList {
    pub fn only(ids: impl IntoIterator<Item = ToolId>) -> Self {
        AllowList::Only(ids.into_iter().collect())
    }

    pub fn permits(&self, id: ToolId) -> bool {
        match self {
            AllowList::All => true,
            AllowList::Only(ids) => ids.contains(&id),
        }
    }

    /// Resolve a model-supplied name under this allow-list.
    ///
    /// With a restricted list, any name outside it (registered or not) is
    /// `NotAllowedTool`; with `All`, an unregistered name is `UnknownTool`.
    pub fn resolve(&self, name: &str) -> Result<ToolId, ToolError> {
        match (ToolId::from_name(name), self) {
            (Ok(id), _) if self.permits(id) => Ok(id),
            (Ok(_), _) | (Err(_), AllowList::Only(_)) => Err(ToolError::NotAllowedTool {
                name: name.to_string(),
            }),
            (Err(e), AllowList::All) => Err(e),
        }
    }
}

/// Tool schemas permitted by `allow`, in declaration order.
pub fn tool_definitions(default_region: &str, allow: &AllowList) -> Vec<ToolDefinition> {
    ToolId::ALL
        .into_iter()
        .filter(|id| allow.permits(*id))
        .map(|id| id.definition(default_region))
        .collect()
}

// ─── Typed arguments ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegionArgs {
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CallsignArgs {
    callsign: String,
    #[serde(default)]
    region: Option<String>,
}

fn parse_args<T: DeserializeOwned>(id: ToolId, args: &Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => json!({}),
        Value::Object(_) => args.clone(),
        other => {
            return Err(ToolError::InvalidArguments {
                tool: id.name().to_string(),
                reason: format!("expected an object, got {other}"),
            })
        }
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: id.name().to_string(),
        reason: e.to_string(),
    })
}

// ─── ToolOutcome ────────────────────────────────────────────────────────────

/// The result of one dispatched tool call, always serializable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub call_id: String,
    pub tool_name: String,
    /// The tool's result, or `{"error": "<message>"}`.
    pub payload: Value,
    pub success: bool,
    pub elapsed_ms: u64,
}

impl ToolOutcome {
    fn failed(call: &ToolCall, err: &ToolError, elapsed_ms: u64) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            payload: json!({ "error": err.to_string() }),
            success: false,
            elapsed_ms,
        }
    }

    /// The error message, when the call failed.
    pub fn error(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }

    /// The `tool` role message correlated with the originating call.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::tool_result(&self.call_id, &self.tool_name, self.payload.to_string())
    }
}

// ─── ToolRegistry ───────────────────────────────────────────────────────────

/// Routes tool calls to the flight tools.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: FlightTools,
}

impl ToolRegistry {
    pub fn new(tools: FlightTools) -> Self {
        Self { tools }
    }

    /// Schemas for the tools `allow` permits.
    pub fn definitions(&self, allow: &AllowList) -> Vec<ToolDefinition> {
        tool_definitions(self.tools.default_region(), allow)
    }

    /// Run one tool with raw JSON arguments.
    pub async fn execute(&self, id: ToolId, args: &Value) -> Result<Value, ToolError> {
        let value = match id {
            ToolId::FlightsListRegionSnapshot => {
                let a: RegionArgs = parse_args(id, args)?;
                serde_json::to_value(self.tools.region_snapshot(a.region.as_deref()).await?)?
            }
            ToolId::FlightsGetByCallsign => {
                let a: CallsignArgs = parse_args(id, args)?;
                serde_json::to_value(
                    self.tools
                        .lookup_callsign(&a.callsign, a.region.as_deref())
                        .await?,
                )?
            }
            ToolId::AlertsListActive => {
                let a: RegionArgs = parse_args(id, args)?;
                serde_json::to_value(self.tools.list_alerts(a.region.as_deref()).await?)?
            }
        };
        Ok(value)
    }

    /// Resolve, check and execute one model tool call.
    ///
    /// A call outside `allow` is never executed. Every failure becomes an
    /// error payload.
    pub async fn dispatch(&self, call: &ToolCall, allow: &AllowList) -> ToolOutcome {
        let start = Instant::now();

        let id = match allow.resolve(&call.name) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "tool call rejected");
                return ToolOutcome::failed(call, &e, 0);
            }
        };

        let result = match &call.arguments {
            ToolArguments::Parsed(args) => self.execute(id, args).await,
            ToolArguments::Malformed { reason, .. } => Err(ToolError::InvalidArguments {
                tool: id.name().to_string(),
                reason: reason.clone(),
            }),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(payload) => {
                tracing::info!(tool = %id, call_id = %call.id, elapsed_ms, "tool call succeeded");
                ToolOutcome {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    payload,
                    success: true,
                    elapsed_ms,
                }
            }
            Err(e) => {
                tracing::warn!(tool = %id, call_id = %call.id, elapsed_ms, error = %e, "tool call failed");
                ToolOutcome::failed(call, &e, elapsed_ms)
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
