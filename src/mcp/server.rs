//! MCP message handling shared by the stdio and HTTP transports.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::error::ToolError;
use crate::mcp::protocol::*;
use crate::tools::{call_tool, tool_definitions};

pub const SERVER_NAME: &str = "cedar-mcp";

type RpcResult = std::result::Result<Value, JsonRpcError>;

fn rpc_error(code: i64, message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.into(),
    }
}

/// Handles one line of the stdio transport.
///
/// Returns the serialized response, or `None` for blank lines and
/// notifications.
pub async fn handle_line(state: &AppState, line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let response = match serde_json::from_str::<Value>(line) {
        Ok(message) => handle_message(state, message).await?,
        Err(e) => {
            warn!(error = %e, "Unparsable JSON-RPC message");
            to_value(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))
        }
    };
    serde_json::to_string(&response).ok()
}

/// Handles a decoded message, single or batch.
pub async fn handle_message(state: &AppState, message: Value) -> Option<Value> {
    match message {
        Value::Array(batch) if batch.is_empty() => Some(to_value(JsonRpcResponse::failure(
            Value::Null,
            INVALID_REQUEST,
            "Empty batch",
        ))),
        Value::Array(batch) => {
            let mut responses = Vec::with_capacity(batch.len());
            for message in batch {
                if let Some(response) = handle_single(state, message).await {
                    responses.push(response);
                }
            }
            (!responses.is_empty()).then_some(Value::Array(responses))
        }
        message => handle_single(state, message).await,
    }
}

async fn handle_single(state: &AppState, message: Value) -> Option<Value> {
    let fallback_id = message.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            return Some(to_value(JsonRpcResponse::failure(
                fallback_id,
                INVALID_REQUEST,
                format!("Invalid request: {e}"),
            )))
        }
    };

    if request.is_notification() {
        debug!(method = %request.method, "Notification received");
        return None;
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    if request.jsonrpc != JSONRPC_VERSION {
        return Some(to_value(JsonRpcResponse::failure(
            id,
            INVALID_REQUEST,
            "jsonrpc must be \"2.0\"",
        )));
    }

    let response = match dispatch(state, &request).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error.code, error.message),
    };
    Some(to_value(response))
}

async fn dispatch(state: &AppState, request: &JsonRpcRequest) -> RpcResult {
    match request.method.as_str() {
        "initialize" => Ok(initialize_result()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tool_definitions() })),
        "tools/call" => call(state, request.params.clone()).await,
        other => Err(rpc_error(METHOD_NOT_FOUND, format!("Method not found: {other}"))),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
    })
}

/// Runs `tools/call`.
///
/// Unknown tools and malformed arguments are protocol errors; failures while
/// running the tool come back as an `isError` result.
async fn call(state: &AppState, params: Option<Value>) -> RpcResult {
    let params: CallToolParams = params
        .ok_or_else(|| rpc_error(INVALID_PARAMS, "Missing params"))
        .and_then(|p| {
            serde_json::from_value(p).map_err(|e| rpc_error(INVALID_PARAMS, e.to_string()))
        })?;

    match call_tool(state, &params.name, params.arguments).await {
        Ok(payload) => Ok(tool_result(&payload)),
        Err(e @ (ToolError::UnknownTool(_) | ToolError::InvalidParams(_))) => {
            Err(rpc_error(e.rpc_code(), e.to_string()))
        }
        Err(e) => {
            warn!(tool = %params.name, error = %e, "Tool failed");
            Ok(tool_error(&e))
        }
    }
}

fn tool_result(payload: &Value) -> Value {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false
    })
}

fn tool_error(error: &ToolError) -> Value {
    json!({
        "content": [{ "type": "text", "text": error.to_string() }],
        "isError": true
    })
}

fn to_value(response: JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}
