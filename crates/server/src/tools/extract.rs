use serde::Deserialize;
use serde_json::{Value, json};

use sb_protocol::CallToolResult;

use super::def::{BoxFut, ToolCtx, ToolDef, ToolError};

pub struct ExtractTool;

#[derive(Debug, Deserialize)]
pub struct ExtractArgs {
	pub instruction: String,
}

impl ToolDef for ExtractTool {
	const NAME: &'static str = "extract";
	const DESCRIPTION: &'static str =
		"Extract structured data from the current page according to an instruction";

	type Raw = ExtractArgs;

	fn input_schema() -> Value {
		json!({
			"type": "object",
			"properties": {
				"instruction": {
					"type": "string",
					"description": "What to extract, e.g. 'the prices of every listed item'"
				}
			},
			"required": ["instruction"]
		})
	}

	fn execute<'a>(raw: Self::Raw, cx: ToolCtx<'a>) -> BoxFut<'a, Result<CallToolResult, ToolError>> {
		Box::pin(async move {
			let data = cx.session.extract(&raw.instruction).await?;
			Ok(CallToolResult::text(data))
		})
	}
}
