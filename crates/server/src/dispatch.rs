//! Protocol dispatcher: decoded request envelope in, response envelope out.
//!
//! Nothing escapes this boundary unconverted. Failures split into two tiers:
//! envelope-level (unknown method, internal fault) become structured
//! [`RpcError`]s with numeric codes; operation-level failures (the tool ran
//! and failed) become *successful* envelopes whose payload is tagged
//! `isError`, carrying the diagnostic trace of that one operation. Callers
//! can always tell "the protocol broke" from "the task failed".

use serde_json::{Value, json};
use tracing::{debug, warn};

use sb_core::SessionConfig;
use sb_protocol::{
	CallToolParams, CallToolResult, InitializeResult, ListPromptsResult, ListResourcesResult,
	ListToolsResult, PROTOCOL_VERSION, Request, Response, RpcError, ServerCapabilities, ServerInfo,
};

use crate::state::AppState;
use crate::tools::{ToolCtx, ToolError, lookup_tool, run_tool, tool_descriptors};

/// Server identity advertised in the initialize handshake.
pub const SERVER_NAME: &str = "stagebridge";

/// Handles one decoded request, producing at most one response envelope.
///
/// Notifications (no id) are acknowledged with `None`. The credentials were
/// resolved when the caller's stream opened; they key the session store and
/// are unrelated to the stream's session id.
pub async fn dispatch(
	state: &AppState,
	config: &SessionConfig,
	request: Request,
) -> Option<Response> {
	if request.is_notification() {
		debug!(target: "sb.dispatch", method = %request.method, "notification acknowledged");
		return None;
	}
	let id = request.id.clone().unwrap_or(Value::Null);

	let envelope = match route(state, config, &request).await {
		Ok(result) => Response::success(id, result),
		Err(error) => {
			warn!(
				target: "sb.dispatch",
				method = %request.method,
				code = error.code,
				error = %error.message,
				"request failed"
			);
			Response::failure(id, error)
		}
	};
	Some(envelope)
}

async fn route(
	state: &AppState,
	config: &SessionConfig,
	request: &Request,
) -> Result<Value, RpcError> {
	match request.method.as_str() {
		"initialize" => encode(InitializeResult {
			protocol_version: PROTOCOL_VERSION.to_string(),
			capabilities: ServerCapabilities {
				tools: Some(json!({})),
				resources: Some(json!({})),
				prompts: Some(json!({})),
			},
			server_info: ServerInfo {
				name: SERVER_NAME.to_string(),
				version: env!("CARGO_PKG_VERSION").to_string(),
			},
		}),
		"ping" => Ok(json!({})),
		"tools/list" => encode(ListToolsResult {
			tools: tool_descriptors(),
		}),
		"resources/list" => encode(ListResourcesResult::default()),
		"prompts/list" => encode(ListPromptsResult::default()),
		"tools/call" => call_tool(state, config, request.params.clone()).await,
		other => Err(RpcError::method_not_found(other)),
	}
}

async fn call_tool(
	state: &AppState,
	config: &SessionConfig,
	params: Option<Value>,
) -> Result<Value, RpcError> {
	let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
		.map_err(RpcError::invalid_params)?;

	// An unknown capability is an application-level failure, not a broken
	// protocol call: the envelope succeeds, the payload says why it didn't.
	let Some(tool) = lookup_tool(&params.name) else {
		return encode(CallToolResult::error_text(format!(
			"Unknown tool: {}",
			params.name
		)));
	};

	// Store failures (validation, construction, wedged probe) are internal
	// protocol errors; the record was left clean for the next call.
	let session = state
		.store
		.acquire(config)
		.await
		.map_err(RpcError::internal)?;

	// Start the operation with an empty trace so diagnostics never leak
	// across unrelated calls.
	session.take_trace();

	let cx = ToolCtx {
		session: &session,
		screenshots: &state.screenshots,
	};
	match run_tool(tool, params.arguments, cx).await {
		Ok(result) => encode(result),
		Err(ToolError::InvalidArguments(detail)) => Err(RpcError::invalid_params(detail)),
		Err(ToolError::Engine(err)) => {
			let mut text = format!("Operation failed: {err}");
			let trace = session.take_trace();
			if !trace.is_empty() {
				text.push_str("\n\nEngine trace:\n");
				text.push_str(&trace.join("\n"));
			}
			encode(CallToolResult::error_text(text))
		}
	}
}

fn encode<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
	serde_json::to_value(value).map_err(RpcError::internal)
}
