use serde::Deserialize;
use serde_json::{Value, json};

use sb_protocol::CallToolResult;

use super::def::{BoxFut, ToolCtx, ToolDef, ToolError};

pub struct ObserveTool;

#[derive(Debug, Deserialize)]
pub struct ObserveArgs {
	pub instruction: String,
}

impl ToolDef for ObserveTool {
	const NAME: &'static str = "observe";
	const DESCRIPTION: &'static str =
		"Observe actionable elements on the current page matching an instruction";

	type Raw = ObserveArgs;

	fn input_schema() -> Value {
		json!({
			"type": "object",
			"properties": {
				"instruction": {
					"type": "string",
					"description": "What to look for, e.g. 'all links in the navigation bar'"
				}
			},
			"required": ["instruction"]
		})
	}

	fn execute<'a>(raw: Self::Raw, cx: ToolCtx<'a>) -> BoxFut<'a, Result<CallToolResult, ToolError>> {
		Box::pin(async move {
			let observations = cx.session.observe(&raw.instruction).await?;
			Ok(CallToolResult::text(observations))
		})
	}
}
