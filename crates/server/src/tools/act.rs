use serde::Deserialize;
use serde_json::{Value, json};

use sb_protocol::CallToolResult;

use super::def::{BoxFut, ToolCtx, ToolDef, ToolError};

pub struct ActTool;

#[derive(Debug, Deserialize)]
pub struct ActArgs {
	/// Atomic natural-language action, e.g. "click the sign in button".
	pub action: String,
}

impl ToolDef for ActTool {
	const NAME: &'static str = "act";
	const DESCRIPTION: &'static str =
		"Perform one atomic action on the current page, described in natural language";

	type Raw = ActArgs;

	fn input_schema() -> Value {
		json!({
			"type": "object",
			"properties": {
				"action": {
					"type": "string",
					"description": "A single atomic action, e.g. 'click the sign in button'"
				}
			},
			"required": ["action"]
		})
	}

	fn execute<'a>(raw: Self::Raw, cx: ToolCtx<'a>) -> BoxFut<'a, Result<CallToolResult, ToolError>> {
		Box::pin(async move {
			let message = cx.session.act(&raw.action).await?;
			Ok(CallToolResult::text(message))
		})
	}
}
