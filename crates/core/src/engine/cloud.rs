//! REST client for the cloud automation engine.
//!
//! The engine hosts the actual browsers; this client creates sessions against
//! a project, drives them with natural-language operations (the engine pairs
//! them with the caller's model API key), and releases them. Operation
//! timeouts are owned by the engine; the client only bounds the HTTP calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Engine, EngineError, EngineSession};
use crate::config::SessionConfig;

/// Default engine API endpoint; override per-process for self-hosted engines.
pub const DEFAULT_ENGINE_URL: &str = "https://api.stagebridge.dev";

const API_KEY_HEADER: &str = "x-engine-api-key";
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Engine factory backed by the cloud REST API.
pub struct CloudEngine {
    http: reqwest::Client,
    base_url: String,
}

impl CloudEngine {
    /// Builds a client for the engine at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionStatusResponse {
    status: String,
}

#[async_trait]
impl Engine for CloudEngine {
    async fn open_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn EngineSession>, EngineError> {
        let mut body = json!({ "projectId": config.engine_project_id });
        if let Some(context_id) = &config.context_id {
            body["contextId"] = json!(context_id);
        }

        let response = self
            .http
            .post(format!("{}/v1/sessions", self.base_url))
            .header(API_KEY_HEADER, &config.engine_api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("malformed create-session reply: {e}")))?;

        debug!(target: "sb.engine", session = %created.id, "engine session created");

        Ok(Arc::new(CloudSession {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            id: created.id,
            engine_api_key: config.engine_api_key.clone(),
            model_api_key: config.model_api_key.clone(),
            trace: Mutex::new(Vec::new()),
        }))
    }
}

/// One live session on the cloud engine.
#[derive(Debug)]
pub struct CloudSession {
    http: reqwest::Client,
    base_url: String,
    id: String,
    engine_api_key: String,
    model_api_key: String,
    /// Engine log lines accumulated by operations, drained per call.
    trace: Mutex<Vec<String>>,
}

impl CloudSession {
    fn session_url(&self, suffix: &str) -> String {
        format!("{}/v1/sessions/{}{}", self.base_url, self.id, suffix)
    }

    /// Runs one operation endpoint, folding engine log lines into the trace.
    async fn op(&self, operation: &str, body: Value) -> Result<Value, EngineError> {
        let response = self
            .http
            .post(self.session_url(&format!("/{operation}")))
            .header(API_KEY_HEADER, &self.engine_api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 | 410 => EngineError::SessionGone(message),
                code => EngineError::Api {
                    status: code,
                    message,
                },
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("malformed {operation} reply: {e}")))?;

        if let Some(logs) = payload.get("logs").and_then(Value::as_array) {
            let mut trace = self.trace.lock();
            trace.extend(logs.iter().filter_map(Value::as_str).map(String::from));
        }

        Ok(payload)
    }

    fn model_body(&self, instruction: &str) -> Value {
        json!({
            "instruction": instruction,
            "modelApiKey": self.model_api_key,
        })
    }
}

/// Renders an operation payload field as display text.
fn render_field(payload: &Value, field: &str, fallback: impl Into<String>) -> String {
    match payload.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => {
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        }
        _ => fallback.into(),
    }
}

#[async_trait]
impl EngineSession for CloudSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> Result<(), EngineError> {
        let response = self
            .http
            .get(self.session_url(""))
            .header(API_KEY_HEADER, &self.engine_api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 | 410 => EngineError::SessionGone(message),
                code => EngineError::Api {
                    status: code,
                    message,
                },
            });
        }

        let state: SessionStatusResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("malformed session status: {e}")))?;

        if state.status != "RUNNING" {
            return Err(EngineError::SessionGone(format!(
                "session {} is {}",
                self.id, state.status
            )));
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<String, EngineError> {
        let payload = self.op("navigate", json!({ "url": url })).await?;
        Ok(render_field(
            &payload,
            "message",
            format!("Navigated to: {url}"),
        ))
    }

    async fn act(&self, instruction: &str) -> Result<String, EngineError> {
        let payload = self.op("act", self.model_body(instruction)).await?;
        Ok(render_field(
            &payload,
            "message",
            format!("Action completed successfully: {instruction}"),
        ))
    }

    async fn extract(&self, instruction: &str) -> Result<String, EngineError> {
        let payload = self.op("extract", self.model_body(instruction)).await?;
        Ok(render_field(&payload, "data", "{}"))
    }

    async fn observe(&self, instruction: &str) -> Result<String, EngineError> {
        let payload = self.op("observe", self.model_body(instruction)).await?;
        Ok(render_field(&payload, "observations", "[]"))
    }

    async fn screenshot(&self) -> Result<String, EngineError> {
        let payload = self.op("screenshot", json!({})).await?;
        match payload.get("data").and_then(Value::as_str) {
            Some(data) => Ok(data.to_string()),
            None => Err(EngineError::Protocol(
                "screenshot reply missing image data".into(),
            )),
        }
    }

    fn take_trace(&self) -> Vec<String> {
        std::mem::take(&mut *self.trace.lock())
    }

    async fn close(&self) -> Result<(), EngineError> {
        let response = self
            .http
            .delete(self.session_url(""))
            .header(API_KEY_HEADER, &self.engine_api_key)
            .send()
            .await?;

        let status = response.status();
        // Releasing an already-gone session is a success for our purposes.
        if !status.is_success() && !matches!(status.as_u16(), 404 | 410) {
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        debug!(target: "sb.engine", session = %self.id, "engine session released");
        Ok(())
    }
}
