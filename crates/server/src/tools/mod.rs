//! Tool registry and generated dispatch glue.

pub mod act;
pub mod def;
pub mod extract;
pub mod navigate;
pub mod observe;
pub mod screenshot;

pub use def::{BoxFut, ToolCtx, ToolDef, ToolError};

/// The registry macro: generates a `ToolId` enum, `lookup_tool`,
/// `tool_descriptors`, and `run_tool`.
///
/// Usage example:
/// ```ignore
/// tool_registry! {
///   Navigate => crate::tools::navigate::NavigateTool,
///   Act => crate::tools::act::ActTool,
/// }
/// ```
macro_rules! tool_registry {
	(
		$( $id:ident => $ty:path ),+ $(,)?
	) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq)]
		pub enum ToolId { $($id),+ }

		pub fn lookup_tool(name: &str) -> Option<ToolId> {
			$(
				if name == <$ty as $crate::tools::def::ToolDef>::NAME {
					return Some(ToolId::$id);
				}
			)+
			None
		}

		/// Descriptors for every registered tool, for `tools/list`.
		pub fn tool_descriptors() -> Vec<sb_protocol::Tool> {
			vec![
				$(
					sb_protocol::Tool {
						name: <$ty as $crate::tools::def::ToolDef>::NAME.to_string(),
						description: <$ty as $crate::tools::def::ToolDef>::DESCRIPTION.to_string(),
						input_schema: <$ty as $crate::tools::def::ToolDef>::input_schema(),
					},
				)+
			]
		}

		/// Run a tool by `ToolId`.
		///
		/// This function is the *only* place that:
		/// - deserializes `Raw` arguments
		/// - awaits `execute(...)`
		pub async fn run_tool(
			id: ToolId,
			args: serde_json::Value,
			cx: $crate::tools::def::ToolCtx<'_>,
		) -> Result<sb_protocol::CallToolResult, $crate::tools::def::ToolError> {
			// Tools without arguments arrive as null; treat that as {}.
			let args = if args.is_null() {
				serde_json::Value::Object(serde_json::Map::new())
			} else {
				args
			};

			match id {
				$(
					ToolId::$id => {
						type Tool = $ty;

						let raw: <Tool as $crate::tools::def::ToolDef>::Raw =
							serde_json::from_value(args).map_err(|e| {
								$crate::tools::def::ToolError::InvalidArguments(format!(
									"invalid arguments for tool '{}': {}",
									<Tool as $crate::tools::def::ToolDef>::NAME,
									e
								))
							})?;

						<Tool as $crate::tools::def::ToolDef>::execute(raw, cx).await
					}
				)+
			}
		}
	};
}

tool_registry! {
	Navigate => crate::tools::navigate::NavigateTool,
	Act => crate::tools::act::ActTool,
	Extract => crate::tools::extract::ExtractTool,
	Observe => crate::tools::observe::ObserveTool,
	Screenshot => crate::tools::screenshot::ScreenshotTool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_tool_by_name() {
		assert_eq!(lookup_tool("navigate"), Some(ToolId::Navigate));
		assert_eq!(lookup_tool("act"), Some(ToolId::Act));
		assert_eq!(lookup_tool("screenshot"), Some(ToolId::Screenshot));
	}

	#[test]
	fn lookup_tool_unknown_returns_none() {
		assert_eq!(lookup_tool("unknown"), None);
		assert_eq!(lookup_tool(""), None);
		assert_eq!(lookup_tool("navigat"), None);
	}

	#[test]
	fn descriptors_cover_every_tool_with_object_schemas() {
		let descriptors = tool_descriptors();
		assert_eq!(descriptors.len(), 5);
		for descriptor in descriptors {
			assert!(!descriptor.description.is_empty());
			assert_eq!(descriptor.input_schema["type"], "object");
		}
	}
}
