//! AgentLoop — the two-round tool-calling protocol.
//!
//! ```text
//! AwaitingModel ─► ModelResponded ─┬─► Done                       (no tool calls)
//!                                  └─► ExecutingTools ─► AwaitingFinalModel ─► Done
//! ```
//!
//! 1. Send `[system, user]` with the allowed tool schemas (`tool_choice=auto`).
//! 2. No tool calls: the reply is the answer.
//! 3. Otherwise append the assistant tool-call turn, run each call through the
//!    registry (disallowed or failing calls become `{"error": …}` results),
//!    and append one `tool` message per call, in call order.
//! 4. Send the augmented conversation once more without tools; that reply is
//!    the answer.
//!
//! At most one round of tool execution happens per invocation. Tool failures
//! never abort the loop; completion-service failures always do.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::config::AgentConfig;
use crate::inference::types::{ChatMessage, CompletionRequest, ToolCall};
use crate::inference::CompletionService;
use crate::tools::{AllowList, ToolOutcome, ToolRegistry};

use super::conversation::Conversation;
use super::errors::{AgentError, PipelineStage};

// ─── Types ──────────────────────────────────────────────────────────────────

/// States of one loop invocation (traced on every transition).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    AwaitingModel,
    ModelResponded,
    ExecutingTools,
    AwaitingFinalModel,
    Done,
}

/// Execution knobs for the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSettings {
    /// Run a batch of tool calls concurrently. Results keep call order.
    pub parallel_tools: bool,
    /// Budget for the whole request, shared by every stage.
    pub deadline: Option<Duration>,
}

impl From<&AgentConfig> for LoopSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            parallel_tools: config.parallel_tool_execution,
            deadline: config.deadline_secs.map(Duration::from_secs),
        }
    }
}

/// The answer of one invocation plus what it took to get there.
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    /// Final natural-language answer (`""` if the model sent no text).
    pub content: String,
    /// One entry per requested tool call, in call order.
    pub tool_outcomes: Vec<ToolOutcome>,
    /// Number of completion-service calls made (1 or 2).
    pub completion_calls: usize,
    /// The full conversation sent on the last completion call.
    pub transcript: Vec<ChatMessage>,
}

// ─── AgentLoop ──────────────────────────────────────────────────────────────

/// Drives the protocol against an injected completion service and registry.
#[derive(Clone)]
pub struct AgentLoop {
    completion: Arc<dyn CompletionService>,
    registry: ToolRegistry,
    settings: LoopSettings,
}

impl AgentLoop {
    pub fn new(completion: Arc<dyn CompletionService>, registry: ToolRegistry) -> Self {
        Self {
            completion,
            registry,
            settings: LoopSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn completion_service(&self) -> &Arc<dyn CompletionService> {
        &self.completion
    }

    /// Absolute deadline for a request starting now, if one is configured.
    pub fn deadline_from_now(&self) -> Option<Instant> {
        self.settings.deadline.map(|d| Instant::now() + d)
    }

    /// Run one invocation with its own deadline.
    pub async fn run(
        &self,
        system_prompt: &str,
        user_query: &str,
        allow: &AllowList,
    ) -> Result<AgentAnswer, AgentError> {
        self.run_until(system_prompt, user_query, allow, self.deadline_from_now())
            .await
    }

    /// Run one invocation against an externally supplied deadline.
    pub async fn run_until(
        &self,
        system_prompt: &str,
        user_query: &str,
        allow: &AllowList,
        deadline: Option<Instant>,
    ) -> Result<AgentAnswer, AgentError> {
        let mut conversation = Conversation::new(system_prompt, user_query);
        let tools = self.registry.definitions(allow);
        tracing::info!(
            model = self.completion.model_name(),
            offered_tools = tools.len(),
            parallel_tools = self.settings.parallel_tools,
            "agent loop started"
        );

        trace_stage(LoopStage::AwaitingModel, conversation.len());
        let first = within(
            deadline,
            PipelineStage::FirstCompletion,
            self.completion
                .complete(CompletionRequest::with_tools(conversation.to_vec(), tools)),
        )
        .await??;
        trace_stage(LoopStage::ModelResponded, conversation.len());

        if !first.has_tool_calls() {
            trace_stage(LoopStage::Done, conversation.len());
            return Ok(AgentAnswer {
                content: first.content_or_empty(),
                tool_outcomes: Vec::new(),
                completion_calls: 1,
                transcript: conversation.into_messages(),
            });
        }

        tracing::info!(
            tool_count = first.tool_calls.len(),
            tools = ?first.tool_calls.iter().map(|tc| tc.name.as_str()).collect::<Vec<_>>(),
            "model requested tools"
        );

        conversation.push_tool_calls(first.content.clone(), &first.tool_calls);

        trace_stage(LoopStage::ExecutingTools, conversation.len());
        let outcomes = within(
            deadline,
            PipelineStage::ToolExecution,
            self.execute_tools(&first.tool_calls, allow),
        )
        .await?;

        for outcome in &outcomes {
            conversation.push_tool_outcome(outcome);
        }
        debug_assert!(conversation.unanswered_call_ids().is_empty());

        trace_stage(LoopStage::AwaitingFinalModel, conversation.len());
        let last = within(
            deadline,
            PipelineStage::FinalCompletion,
            self.completion
                .complete(CompletionRequest::text_only(conversation.to_vec())),
        )
        .await??;
        trace_stage(LoopStage::Done, conversation.len());

        Ok(AgentAnswer {
            content: last.content_or_empty(),
            tool_outcomes: outcomes,
            completion_calls: 2,
            transcript: conversation.into_messages(),
        })
    }

    /// Dispatch every call; the returned outcomes are in call order.
    async fn execute_tools(&self, calls: &[ToolCall], allow: &AllowList) -> Vec<ToolOutcome> {
        if self.settings.parallel_tools {
            // join_all yields results in input order regardless of completion order
            return join_all(calls.iter().map(|tc| self.registry.dispatch(tc, allow))).await;
        }

        let mut outcomes = Vec::with_capacity(calls.len());
        for tc in calls {
            outcomes.push(self.registry.dispatch(tc, allow).await);
        }
        outcomes
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Await `fut`, failing with `DeadlineExceeded { stage }` past `deadline`.
pub(crate) async fn within<F: Future>(
    deadline: Option<Instant>,
    stage: PipelineStage,
    fut: F,
) -> Result<F::Output, AgentError> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.map_err(|_| {
            tracing::warn!(%stage, "deadline exceeded");
            AgentError::DeadlineExceeded { stage }
        }),
        None => Ok(fut.await),
    }
}

fn trace_stage(stage: LoopStage, message_count: usize) {
    tracing::debug!(?stage, message_count, "agent loop transition");
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::flight_data::{Flight, FlightDataError};
    use crate::inference::types::{Role, ToolChoice};
    use crate::inference::{Completion, InferenceError};
    use crate::test_support::{tool_call, ScriptedCompletion, StaticSnapshotSource};
    use crate::tools::{FlightTools, ToolId};

    fn flights() -> Vec<Flight> {
        vec![Flight {
            icao24: "760827".into(),
            callsign: Some("PIA293".into()),
            geo_altitude: Some(9000.0),
            velocity: Some(50.0),
            vertical_rate: Some(-25.0),
            ..Default::default()
        }]
    }

    fn setup(script: Vec<Completion>) -> (AgentLoop, Arc<ScriptedCompletion>, Arc<StaticSnapshotSource>) {
        let completion = Arc::new(ScriptedCompletion::new(script));
        let source = Arc::new(StaticSnapshotSource::with_flights("region1", flights()));
        let registry = ToolRegistry::new(FlightTools::new(source.clone(), "region1"));
        (AgentLoop::new(completion.clone(), registry), completion, source)
    }

    fn tool_messages(transcript: &[ChatMessage]) -> Vec<&ChatMessage> {
        transcript.iter().filter(|m| m.role == Role::Tool).collect()
    }

    #[tokio::test]
    async fn test_direct_answer_uses_one_call() {
        let (agent, completion, source) = setup(vec![Completion::text("Skies are quiet.")]);

        let answer = agent.run("sys", "hello", &AllowList::All).await.unwrap();

        assert_eq!(answer.content, "Skies are quiet.");
        assert_eq!(answer.completion_calls, 1);
        assert_eq!(completion.call_count(), 1);
        assert_eq!(source.fetch_count(), 0);

        let req = &completion.requests()[0];
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.tool_choice, Some(ToolChoice::Auto));
        assert_eq!(req.tools.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_n_tool_calls_make_two_completion_calls() {
        for n in 1..=3usize {
            let calls = (0..n)
                .map(|i| tool_call(&format!("c{i}"), "alerts_list_active", json!({})))
                .collect();
            let (agent, completion, source) = setup(vec![
                Completion::tool_calls(calls),
                Completion::text("One warning."),
            ]);

            let answer = agent.run("sys", "sitrep", &AllowList::All).await.unwrap();

            assert_eq!(answer.content, "One warning.");
            assert_eq!(completion.call_count(), 2);
            assert_eq!(answer.completion_calls, 2);
            assert_eq!(source.fetch_count(), n);
            assert_eq!(answer.tool_outcomes.len(), n);
        }
    }

    #[tokio::test]
    async fn test_second_call_carries_tool_results_without_tools() {
        let (agent, completion, _) = setup(vec![
            Completion::tool_calls(vec![
                tool_call("a", "flights_get_by_callsign", json!({"callsign": "pia293"})),
                tool_call("b", "alerts_list_active", json!({"region": "region1"})),
            ]),
            Completion::text("done"),
        ]);

        agent.run("sys", "q", &AllowList::All).await.unwrap();

        let second = &completion.requests()[1];
        assert!(second.tools.is_none());
        assert!(second.tool_choice.is_none());

        let roles: Vec<Role> = second.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool]
        );

        let tools = tool_messages(&second.messages);
        assert_eq!(tools[0].tool_call_id.as_deref(), Some("a"));
        assert_eq!(tools[1].tool_call_id.as_deref(), Some("b"));

        let lookup: serde_json::Value =
            serde_json::from_str(tools[0].content.as_deref().unwrap()).unwrap();
        assert_eq!(lookup["flight"]["icao24"], "760827");
    }

    #[tokio::test]
    async fn test_disallowed_tool_is_reported_not_run() {
        let (agent, completion, source) = setup(vec![
            Completion::tool_calls(vec![tool_call("x", "alerts_list_active", json!({}))]),
            Completion::text("I can only look up your flight."),
        ]);
        let traveler = AllowList::only([ToolId::FlightsGetByCallsign]);

        let answer = agent.run("sys", "any alerts?", &traveler).await.unwrap();

        assert_eq!(source.fetch_count(), 0);
        assert_eq!(answer.content, "I can only look up your flight.");
        assert_eq!(
            answer.tool_outcomes[0].error(),
            Some("Tool alerts_list_active is not allowed for this agent.")
        );

        let first = &completion.requests()[0];
        assert_eq!(first.tools.as_ref().map(Vec::len), Some(1));

        let second = &completion.requests()[1];
        let tool_msg = tool_messages(&second.messages)[0];
        let payload: serde_json::Value =
            serde_json::from_str(tool_msg.content.as_deref().unwrap()).unwrap();
        assert!(payload.get("error").is_some());
    }

    #[tokio::test]
    async fn test_tool_failure_does_not_abort() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Completion::tool_calls(vec![tool_call("c", "flights_list_region_snapshot", json!({}))]),
            Completion::text("The feed is down."),
        ]));
        let source = Arc::new(StaticSnapshotSource::failing(FlightDataError::UpstreamError {
            url: "http://n8n/latest".into(),
            reason: "HTTP 502".into(),
        }));
        let agent = AgentLoop::new(
            completion.clone(),
            ToolRegistry::new(FlightTools::new(source, "region1")),
        );

        let answer = agent.run("sys", "q", &AllowList::All).await.unwrap();
        assert_eq!(answer.content, "The feed is down.");
        assert!(!answer.tool_outcomes[0].success);
        assert_eq!(completion.call_count(), 2);
    }

    #[tokio::test]
    async fn test_blank_tool_name_is_answered_with_error() {
        let body = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"bad","type":"function","function":{"name":"","arguments":"{}"}},
            {"id":"good","type":"function","function":{"name":"flights_get_by_callsign","arguments":"{\"callsign\":\"PIA293\"}"}}
        ]},"finish_reason":"tool_calls"}]}"#;
        let first = crate::inference::response::parse_completion_response(body).unwrap();
        let (agent, completion, source) = setup(vec![first, Completion::text("Found it.")]);

        let answer = agent.run("sys", "q", &AllowList::All).await.unwrap();

        assert_eq!(answer.content, "Found it.");
        assert_eq!(completion.call_count(), 2);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(answer.tool_outcomes[0].call_id, "bad");
        assert_eq!(answer.tool_outcomes[0].error(), Some("Unknown tool: "));
        assert!(answer.tool_outcomes[1].success);

        assert_eq!(answer.transcript, completion.requests()[1].messages);
        let tool_ids: Vec<_> = tool_messages(&answer.transcript)
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(tool_ids, ["bad", "good"]);
    }

    #[tokio::test]
    async fn test_blank_tool_name_under_role_is_not_allowed() {
        let (agent, completion, _) = setup(vec![
            Completion::tool_calls(vec![tool_call("c", "", json!({}))]),
            Completion::text("ok"),
        ]);
        let traveler = AllowList::only([ToolId::FlightsGetByCallsign]);

        let answer = agent.run("sys", "q", &traveler).await.unwrap();

        assert_eq!(completion.call_count(), 2);
        assert_eq!(
            answer.tool_outcomes[0].error(),
            Some("Tool  is not allowed for this agent.")
        );
    }

    #[tokio::test]
    async fn test_parallel_execution_keeps_call_order() {
        let calls = vec![
            tool_call("first", "flights_get_by_callsign", json!({"callsign": "PIA293"})),
            tool_call("second", "alerts_list_active", json!({})),
            tool_call("third", "unknown_tool", json!({})),
        ];
        let (agent, completion, _) =
            setup(vec![Completion::tool_calls(calls), Completion::text("ok")]);
        let agent = agent.with_settings(LoopSettings {
            parallel_tools: true,
            deadline: None,
        });

        let answer = agent.run("sys", "q", &AllowList::All).await.unwrap();

        let ids: Vec<&str> = answer.tool_outcomes.iter().map(|o| o.call_id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
        let sent: Vec<_> = tool_messages(&completion.requests()[1].messages)
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(sent, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_missing_content_becomes_empty_string() {
        let (agent, _, _) = setup(vec![Completion::default()]);
        let answer = agent.run("sys", "q", &AllowList::All).await.unwrap();
        assert_eq!(answer.content, "");
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let (agent, completion, _) = setup(vec![]);
        completion.push_error(InferenceError::MissingApiKey {
            env_var: "GROQ_API_KEY".into(),
        });
        let err = agent.run("sys", "q", &AllowList::All).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Inference(InferenceError::MissingApiKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_final_completion_failure_propagates() {
        let (agent, completion, _) = setup(vec![Completion::tool_calls(vec![tool_call(
            "c",
            "alerts_list_active",
            json!({}),
        )])]);
        let err = agent.run("sys", "q", &AllowList::All).await.unwrap_err();
        assert!(matches!(err, AgentError::Inference(InferenceError::HttpError { .. })));
        assert_eq!(completion.call_count(), 2);
    }

    struct SlowCompletion;

    #[async_trait]
    impl CompletionService for SlowCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, InferenceError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(Completion::text("late"))
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded_names_stage() {
        let source = Arc::new(StaticSnapshotSource::with_flights("region1", flights()));
        let agent = AgentLoop::new(
            Arc::new(SlowCompletion),
            ToolRegistry::new(FlightTools::new(source, "region1")),
        )
        .with_settings(LoopSettings {
            parallel_tools: false,
            deadline: Some(Duration::from_millis(20)),
        });

        let err = agent.run("sys", "q", &AllowList::All).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::DeadlineExceeded {
                stage: PipelineStage::FirstCompletion
            }
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let settings = LoopSettings::from(&AgentConfig {
            parallel_tool_execution: true,
            deadline_secs: Some(30),
        });
        assert!(settings.parallel_tools);
        assert_eq!(settings.deadline, Some(Duration::from_secs(30)));
    }
}
