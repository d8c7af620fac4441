//! Test doubles for the two external collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::flight_data::{Flight, FlightDataError, Snapshot, SnapshotSource};
use crate::inference::{Completion, CompletionRequest, CompletionService, InferenceError, ToolCall};

// ─── StaticSnapshotSource ───────────────────────────────────────────────────

/// Serves one fixed snapshot (or error) for its region and counts fetches.
pub struct StaticSnapshotSource {
    region: String,
    result: Result<Snapshot, FlightDataError>,
    fetches: AtomicUsize,
}

impl StaticSnapshotSource {
    pub fn with_flights(region: &str, flights: Vec<Flight>) -> Self {
        Self {
            region: region.to_string(),
            result: Ok(Snapshot::new(
                region,
                Some(1_760_000_000),
                "2026-10-18T12:00:00+00:00",
                flights,
            )),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: FlightDataError) -> Self {
        Self {
            region: "region1".to_string(),
            result: Err(err),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.result.as_ref().ok().cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch(&self, region: &str) -> Result<Snapshot, FlightDataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if region != self.region {
            return Err(FlightDataError::UnknownRegion {
                region: region.to_string(),
                known: vec![self.region.clone()],
            });
        }
        self.result.clone()
    }
}

// ─── ScriptedCompletion ─────────────────────────────────────────────────────

/// Replays queued completions in order and records every request.
///
/// Running out of script is reported as an HTTP 500 so a test that makes an
/// unexpected extra call fails loudly.
#[derive(Default)]
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<Completion, InferenceError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Completion>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, err: InferenceError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, InferenceError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(InferenceError::HttpError {
                    status: 500,
                    body: "script exhausted".into(),
                })
            })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Shorthand for a parsed tool call.
pub fn tool_call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.into(),
    }
}
