//! Tool plumbing: the execute contract shared by every capability.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use sb_core::{EngineError, EngineSession};
use sb_protocol::CallToolResult;

use crate::screenshots::ScreenshotStore;

/// Everything a tool body may touch: the engine session borrowed from the
/// store for this one operation, plus the screenshot log.
pub struct ToolCtx<'a> {
	pub session: &'a Arc<dyn EngineSession>,
	pub screenshots: &'a ScreenshotStore,
}

/// Failures a tool can produce. Engine failures become application-level
/// (`isError`) results at the dispatch boundary; argument failures are
/// protocol-level.
#[derive(Debug, Error)]
pub enum ToolError {
	#[error("{0}")]
	InvalidArguments(String),

	#[error(transparent)]
	Engine(#[from] EngineError),
}

/// Boxing alias: stable async in trait without `async_trait`.
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Canonical tool trait. Each tool module becomes
/// `pub struct XxxTool; impl ToolDef for XxxTool { ... }`
pub trait ToolDef: 'static {
	const NAME: &'static str;
	const DESCRIPTION: &'static str;

	type Raw: DeserializeOwned;

	/// JSON schema for the tool's arguments, as advertised by `tools/list`.
	fn input_schema() -> Value;

	/// Execute against the borrowed session. The handle must not be retained
	/// past this call.
	fn execute<'a>(raw: Self::Raw, cx: ToolCtx<'a>) -> BoxFut<'a, Result<CallToolResult, ToolError>>;
}
