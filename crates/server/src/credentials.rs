//! Credential resolution at the stream-open boundary.
//!
//! Each credential field resolves from the query string first, then request
//! headers, then process-wide environment defaults. Validation happens here,
//! once, before anything reaches the dispatcher.

use std::collections::HashMap;

use axum::http::HeaderMap;

use sb_core::{Error, SessionConfig};

pub const QUERY_ENGINE_API_KEY: &str = "engineApiKey";
pub const QUERY_ENGINE_PROJECT_ID: &str = "engineProjectId";
pub const QUERY_MODEL_API_KEY: &str = "modelApiKey";
pub const QUERY_CONTEXT_ID: &str = "contextId";

pub const HEADER_ENGINE_API_KEY: &str = "x-engine-api-key";
pub const HEADER_ENGINE_PROJECT_ID: &str = "x-engine-project-id";
pub const HEADER_MODEL_API_KEY: &str = "x-model-api-key";
pub const HEADER_CONTEXT_ID: &str = "x-context-id";

pub const ENV_ENGINE_API_KEY: &str = "ENGINE_API_KEY";
pub const ENV_ENGINE_PROJECT_ID: &str = "ENGINE_PROJECT_ID";
pub const ENV_MODEL_API_KEY: &str = "MODEL_API_KEY";
pub const ENV_CONTEXT_ID: &str = "ENGINE_CONTEXT_ID";

/// Process-wide credential defaults, captured once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
	pub engine_api_key: Option<String>,
	pub engine_project_id: Option<String>,
	pub model_api_key: Option<String>,
	pub context_id: Option<String>,
}

impl EnvCredentials {
	pub fn from_env() -> Self {
		Self {
			engine_api_key: std::env::var(ENV_ENGINE_API_KEY).ok(),
			engine_project_id: std::env::var(ENV_ENGINE_PROJECT_ID).ok(),
			model_api_key: std::env::var(ENV_MODEL_API_KEY).ok(),
			context_id: std::env::var(ENV_CONTEXT_ID).ok(),
		}
	}
}

/// Resolves a validated [`SessionConfig`] from one stream-open request.
pub fn resolve(
	query: &HashMap<String, String>,
	headers: &HeaderMap,
	env: &EnvCredentials,
) -> Result<SessionConfig, Error> {
	SessionConfig::from_parts(
		pick(query, headers, env.engine_api_key.as_deref(), QUERY_ENGINE_API_KEY, HEADER_ENGINE_API_KEY),
		pick(query, headers, env.engine_project_id.as_deref(), QUERY_ENGINE_PROJECT_ID, HEADER_ENGINE_PROJECT_ID),
		pick(query, headers, env.model_api_key.as_deref(), QUERY_MODEL_API_KEY, HEADER_MODEL_API_KEY),
		pick(query, headers, env.context_id.as_deref(), QUERY_CONTEXT_ID, HEADER_CONTEXT_ID),
	)
}

/// Message for the 401 handshake rejection, naming every accepted
/// query/header pair.
pub fn unauthorized_message() -> String {
	format!(
		"Missing required credentials. Provide {QUERY_ENGINE_API_KEY} (or {HEADER_ENGINE_API_KEY} header), \
		 {QUERY_ENGINE_PROJECT_ID} (or {HEADER_ENGINE_PROJECT_ID} header), and \
		 {QUERY_MODEL_API_KEY} (or {HEADER_MODEL_API_KEY} header)."
	)
}

/// Query beats header beats environment; empty values count as absent.
fn pick(
	query: &HashMap<String, String>,
	headers: &HeaderMap,
	env: Option<&str>,
	query_key: &str,
	header_key: &str,
) -> Option<String> {
	query
		.get(query_key)
		.map(String::as_str)
		.or_else(|| headers.get(header_key).and_then(|v| v.to_str().ok()))
		.or(env)
		.filter(|v| !v.is_empty())
		.map(String::from)
}
