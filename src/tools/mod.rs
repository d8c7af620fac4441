//! Tool layer — the flight tools and the registry the agent loop calls them through.
//!
//! Submodules:
//! - `handlers`: region snapshot, callsign lookup, anomaly listing
//! - `anomaly`: threshold rules behind `alerts_list_active`
//! - `registry`: tool ids, schemas, allow-lists, dispatch
//! - `errors`: tool-level error types

pub mod anomaly;
pub mod errors;
pub mod handlers;
pub mod registry;

pub use anomaly::AnomalyRules;
pub use errors::ToolError;
pub use handlers::FlightTools;
pub use registry::{tool_definitions, AllowList, ToolId, ToolOutcome, ToolRegistry};
