//! MCP method handling over the tool registry.
//!
//! Transport-free: [`McpServer::handle`] takes one decoded request and
//! returns the response, or `None` for a notification.

use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};

use crate::tools::{AllowList, ToolError, ToolId, ToolRegistry};

use super::types::{
    error_codes, CallToolParams, CallToolResult, ContentBlock, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpTool, ServerCapabilities, ServerInfo,
    ToolsCapability, MCP_PROTOCOL_VERSION,
};

pub const SERVER_NAME: &str = "Airspace Copilot";

/// Exposes every flight tool to MCP clients.
#[derive(Clone)]
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "MCP notification");
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(error_codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => to_result(&self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&self.list_tools()),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => {
                tracing::warn!(method = %request.method, code = error.code, error = %error.message, "MCP request failed");
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    fn initialize(&self) -> InitializeResult {
        tracing::info!(protocol_version = MCP_PROTOCOL_VERSION, "MCP session initialized");
        InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability::default(),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    fn list_tools(&self) -> ListToolsResult {
        let tools = self
            .registry
            .definitions(&AllowList::All)
            .into_iter()
            .map(|def| McpTool {
                name: def.function.name,
                description: def.function.description,
                input_schema: def.function.parameters,
            })
            .collect();
        ListToolsResult { tools }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::new(error_codes::INVALID_PARAMS, "missing params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::new(error_codes::INVALID_PARAMS, e.to_string()))
            })?;

        let id = ToolId::from_name(&params.name)
            .map_err(|e| JsonRpcError::new(error_codes::INVALID_PARAMS, e.to_string()))?;
        let args = params.arguments.unwrap_or_else(|| json!({}));

        let start = Instant::now();
        let outcome = self.registry.execute(id, &args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(payload) => {
                tracing::info!(tool = %id, elapsed_ms, "MCP tool call succeeded");
                CallToolResult {
                    content: vec![ContentBlock::Text {
                        text: payload.to_string(),
                    }],
                    structured_content: Some(payload),
                    is_error: false,
                }
            }
            Err(e) => {
                tracing::warn!(tool = %id, elapsed_ms, error = %e, "MCP tool call failed");
                tool_error_result(&e)
            }
        };
        to_result(&result)
    }
}

fn tool_error_result(err: &ToolError) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::Text {
            text: json!({ "error": err.to_string() }).to_string(),
        }],
        structured_content: None,
        is_error: true,
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
}
