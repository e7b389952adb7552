use serde::Deserialize;
use serde_json::{Value, json};

use sb_protocol::CallToolResult;

use super::def::{BoxFut, ToolCtx, ToolDef, ToolError};

pub struct NavigateTool;

#[derive(Debug, Deserialize)]
pub struct NavigateArgs {
	pub url: String,
}

impl ToolDef for NavigateTool {
	const NAME: &'static str = "navigate";
	const DESCRIPTION: &'static str = "Navigate the session's page to a URL";

	type Raw = NavigateArgs;

	fn input_schema() -> Value {
		json!({
			"type": "object",
			"properties": {
				"url": { "type": "string", "description": "The URL to navigate to" }
			},
			"required": ["url"]
		})
	}

	fn execute<'a>(raw: Self::Raw, cx: ToolCtx<'a>) -> BoxFut<'a, Result<CallToolResult, ToolError>> {
		Box::pin(async move {
			let message = cx.session.navigate(&raw.url).await?;
			Ok(CallToolResult::text(message))
		})
	}
}
