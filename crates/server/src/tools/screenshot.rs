use serde::Deserialize;
use serde_json::{Value, json};

use sb_protocol::{CallToolResult, ContentItem};

use super::def::{BoxFut, ToolCtx, ToolDef, ToolError};

pub struct ScreenshotTool;

#[derive(Debug, Default, Deserialize)]
pub struct ScreenshotArgs {
	/// Optional name for the shot; defaults to a timestamped one.
	#[serde(default)]
	pub name: Option<String>,
}

impl ToolDef for ScreenshotTool {
	const NAME: &'static str = "screenshot";
	const DESCRIPTION: &'static str = "Capture the current page as a PNG image";

	type Raw = ScreenshotArgs;

	fn input_schema() -> Value {
		json!({
			"type": "object",
			"properties": {
				"name": { "type": "string", "description": "Optional name for the screenshot" }
			}
		})
	}

	fn execute<'a>(raw: Self::Raw, cx: ToolCtx<'a>) -> BoxFut<'a, Result<CallToolResult, ToolError>> {
		Box::pin(async move {
			let data = cx.session.screenshot().await?;
			let name = raw
				.name
				.filter(|n| !n.is_empty())
				.unwrap_or_else(|| format!("screenshot-{}", now_ts()));
			cx.screenshots.insert(name.clone(), data.clone());

			Ok(CallToolResult {
				content: vec![
					ContentItem::Text {
						text: format!("Screenshot taken: {name}"),
					},
					ContentItem::Image {
						data,
						mime_type: "image/png".to_string(),
					},
				],
				is_error: false,
			})
		})
	}
}

fn now_ts() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
