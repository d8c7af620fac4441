//! MCP server — exposes the flight tools to any Model Context Protocol client.
//!
//! Submodules:
//! - `types`: JSON-RPC 2.0 envelopes and MCP result payloads
//! - `server`: `initialize`, `ping`, `tools/list` and `tools/call` over the registry
//! - `http`: axum router for `POST /mcp`

pub mod http;
pub mod server;
pub mod types;

pub use http::{router, serve};
pub use server::McpServer;
pub use types::MCP_PROTOCOL_VERSION;
