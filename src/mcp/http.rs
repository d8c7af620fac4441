//! HTTP transport: JSON-RPC over `POST /mcp`, answered with plain JSON.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use super::server::McpServer;
use super::types::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/mcp", post(handle_rpc))
        .with_state(server)
}

/// Serve the MCP endpoint until Ctrl-C.
pub async fn serve(server: McpServer, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "MCP server listening on /mcp");
    axum::serve(listener, router(server))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("MCP server shutting down");
        })
        .await
}

async fn handle_rpc(State(server): State<McpServer>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            return rpc_error(error_codes::PARSE_ERROR, format!("parse error: {e}"));
        }
    };
    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            return rpc_error(error_codes::INVALID_REQUEST, format!("invalid request: {e}"));
        }
    };

    match server.handle(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn rpc_error(code: i32, message: String) -> Response {
    Json(JsonRpcResponse::failure(Value::Null, JsonRpcError::new(code, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt; // for oneshot

    use crate::flight_data::Flight;
    use crate::test_support::StaticSnapshotSource;
    use crate::tools::{FlightTools, ToolRegistry};

    fn app() -> Router {
        let source = Arc::new(StaticSnapshotSource::with_flights(
            "region1",
            vec![Flight {
                icao24: "760827".into(),
                callsign: Some("PIA293".into()),
                ..Default::default()
            }],
        ));
        router(McpServer::new(ToolRegistry::new(FlightTools::new(
            source, "region1",
        ))))
    }

    async fn post_mcp(body: impl Into<Body>) -> (StatusCode, Option<Value>) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).ok();
        (status, json)
    }

    #[tokio::test]
    async fn test_tools_call_over_http() {
        let request = json!({
            "jsonrpc": "2.0",
            "id": "abc",
            "method": "tools/call",
            "params": {"name": "flights_get_by_callsign", "arguments": {"callsign": "PIA293"}}
        });
        let (status, body) = post_mcp(request.to_string()).await;
        let body = body.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "abc");
        assert_eq!(body["result"]["isError"], false);
        assert_eq!(body["result"]["structuredContent"]["flight"]["icao24"], "760827");
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let (status, body) = post_mcp(request.to_string()).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let (status, body) = post_mcp("{not json").await;
        let body = body.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_batch_is_invalid_request() {
        let (_, body) = post_mcp(json!([{"jsonrpc": "2.0", "id": 1, "method": "ping"}]).to_string()).await;
        assert_eq!(body.unwrap()["error"]["code"], error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_get_is_not_routed_as_rpc() {
        let response = app()
            .oneshot(Request::builder().uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
