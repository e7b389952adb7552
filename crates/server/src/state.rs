//! Shared application state passed to axum handlers.

use std::sync::Arc;

use tokio::sync::mpsc;

use sb_core::{ConnectionRegistry, Engine, SessionConfig, SessionStore};
use sb_protocol::Response;

use crate::screenshots::ScreenshotStore;

/// One open event stream: the sender feeding its SSE body, plus the
/// credentials resolved at handshake time. Credentials key the session
/// store; the stream session id keys the registry. The two namespaces are
/// independent.
#[derive(Clone)]
pub struct StreamConnection {
	pub tx: mpsc::Sender<Response>,
	pub config: SessionConfig,
}

/// Process-wide stores, constructed once at startup and drained at shutdown.
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<SessionStore>,
	pub registry: Arc<ConnectionRegistry<StreamConnection>>,
	pub screenshots: Arc<ScreenshotStore>,
	pub env: crate::credentials::EnvCredentials,
}

impl AppState {
	pub fn new(engine: Arc<dyn Engine>, env: crate::credentials::EnvCredentials) -> Self {
		Self {
			store: Arc::new(SessionStore::new(engine)),
			registry: Arc::new(ConnectionRegistry::new()),
			screenshots: Arc::new(ScreenshotStore::new()),
			env,
		}
	}

	/// Drains both stores. Called once on shutdown.
	pub async fn shutdown(&self) {
		self.store.release_all().await;
		self.registry.clear();
	}
}
