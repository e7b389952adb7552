#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use sb_core::{Engine, EngineError, EngineSession, SessionConfig};
use sb_server::credentials::EnvCredentials;
use sb_server::state::AppState;

/// In-memory engine standing in for the cloud API.
#[derive(Default)]
pub struct FakeEngine {
	pub constructed: AtomicUsize,
	pub sessions: Mutex<Vec<Arc<FakeSession>>>,
}

impl FakeEngine {
	pub fn last_session(&self) -> Arc<FakeSession> {
		self.sessions.lock().last().cloned().expect("no session constructed")
	}
}

#[derive(Debug)]
pub struct FakeSession {
	pub id: String,
	pub trace: Mutex<Vec<String>>,
	pub fail_act: AtomicBool,
	pub closed: AtomicBool,
}

#[async_trait]
impl Engine for FakeEngine {
	async fn open_session(
		&self,
		_config: &SessionConfig,
	) -> Result<Arc<dyn EngineSession>, EngineError> {
		let n = self.constructed.fetch_add(1, Ordering::SeqCst);
		let session = Arc::new(FakeSession {
			id: format!("fake-{n}"),
			trace: Mutex::new(Vec::new()),
			fail_act: AtomicBool::new(false),
			closed: AtomicBool::new(false),
		});
		self.sessions.lock().push(Arc::clone(&session));
		Ok(session)
	}
}

#[async_trait]
impl EngineSession for FakeSession {
	fn id(&self) -> &str {
		&self.id
	}

	async fn probe(&self) -> Result<(), EngineError> {
		Ok(())
	}

	async fn navigate(&self, url: &str) -> Result<String, EngineError> {
		self.trace.lock().push(format!("goto {url}"));
		Ok(format!("Navigated to: {url}"))
	}

	async fn act(&self, instruction: &str) -> Result<String, EngineError> {
		self.trace.lock().push(format!("act: {instruction}"));
		if self.fail_act.load(Ordering::SeqCst) {
			return Err(EngineError::Api {
				status: 500,
				message: "action could not be completed".into(),
			});
		}
		Ok(format!("Action completed successfully: {instruction}"))
	}

	async fn extract(&self, instruction: &str) -> Result<String, EngineError> {
		self.trace.lock().push(format!("extract: {instruction}"));
		Ok(r#"{"items":[]}"#.into())
	}

	async fn observe(&self, instruction: &str) -> Result<String, EngineError> {
		self.trace.lock().push(format!("observe: {instruction}"));
		Ok("[]".into())
	}

	async fn screenshot(&self) -> Result<String, EngineError> {
		Ok("iVBORw0KGgo=".into())
	}

	fn take_trace(&self) -> Vec<String> {
		std::mem::take(&mut *self.trace.lock())
	}

	async fn close(&self) -> Result<(), EngineError> {
		self.closed.store(true, Ordering::SeqCst);
		Ok(())
	}
}

/// State wired to a fake engine and empty env defaults.
pub fn test_state() -> (Arc<FakeEngine>, AppState) {
	let engine = Arc::new(FakeEngine::default());
	let state = AppState::new(engine.clone(), EnvCredentials::default());
	(engine, state)
}

pub fn test_config() -> SessionConfig {
	SessionConfig::from_parts(
		Some("bb_test_key".into()),
		Some("proj_test".into()),
		Some("sk_test".into()),
		None,
	)
	.expect("test config is complete")
}
