//! Engine abstraction: the expensive remote automation resource.
//!
//! The session store only ever sees these traits, so its lifecycle logic can
//! be exercised against in-memory fakes. The production implementation is
//! [`CloudEngine`], a REST client for the cloud automation engine.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SessionConfig;

mod cloud;

pub use cloud::{CloudEngine, DEFAULT_ENGINE_URL};

/// Errors raised by engine session construction and operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The underlying session died out-of-band (expired, released, or its
    /// browser context was destroyed). Recoverable by recreation.
    #[error("engine session gone: {0}")]
    SessionGone(String),

    /// The engine API rejected a call.
    #[error("engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The engine could not be reached.
    #[error("engine transport error: {0}")]
    Transport(String),

    /// The engine replied with an unexpected shape.
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

impl EngineError {
    /// Classifies this error as "the session is gone and may be silently
    /// recreated" versus any other failure.
    ///
    /// The structured [`EngineError::SessionGone`] kind and HTTP 404/410 are
    /// authoritative; the message scan is a compatibility shim for engines
    /// that only report a generic error string.
    pub fn is_session_gone(&self) -> bool {
        match self {
            EngineError::SessionGone(_) => true,
            EngineError::Api { status, message } => {
                matches!(status, 404 | 410) || message_indicates_gone(message)
            }
            EngineError::Transport(message) | EngineError::Protocol(message) => {
                message_indicates_gone(message)
            }
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Transport(err.to_string())
    }
}

/// The single place that understands "gone"-shaped error text.
fn message_indicates_gone(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    [
        "context destroyed",
        "session expired",
        "session not found",
        "target closed",
        "browser has been closed",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

/// Factory for engine sessions.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Creates one live session for `config`. Expensive; callers are expected
    /// to reuse sessions through the session store.
    async fn open_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn EngineSession>, EngineError>;
}

/// One live automation session.
///
/// Handles are borrowed from the session store for the duration of a single
/// operation; the store retains ownership and decides when to close.
#[async_trait]
pub trait EngineSession: Send + Sync + std::fmt::Debug {
    /// Engine-assigned session identifier.
    fn id(&self) -> &str;

    /// Cheap, side-effect-free liveness check.
    async fn probe(&self) -> Result<(), EngineError>;

    /// Navigates the session's page to `url`.
    async fn navigate(&self, url: &str) -> Result<String, EngineError>;

    /// Performs a natural-language action on the current page.
    async fn act(&self, instruction: &str) -> Result<String, EngineError>;

    /// Extracts structured data from the current page.
    async fn extract(&self, instruction: &str) -> Result<String, EngineError>;

    /// Observes actionable elements on the current page.
    async fn observe(&self, instruction: &str) -> Result<String, EngineError>;

    /// Captures the current page as base64-encoded PNG bytes.
    async fn screenshot(&self) -> Result<String, EngineError>;

    /// Drains the diagnostic trace accumulated by operations since the last
    /// drain. Called at operation start so traces never leak across calls.
    fn take_trace(&self) -> Vec<String>;

    /// Releases the remote session.
    async fn close(&self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_gone_kind_is_authoritative() {
        assert!(EngineError::SessionGone("released".into()).is_session_gone());
        assert!(
            EngineError::Api {
                status: 404,
                message: "no such session".into()
            }
            .is_session_gone()
        );
        assert!(
            EngineError::Api {
                status: 410,
                message: "gone".into()
            }
            .is_session_gone()
        );
    }

    #[test]
    fn ordinary_failures_are_not_gone() {
        assert!(
            !EngineError::Api {
                status: 500,
                message: "engine exploded".into()
            }
            .is_session_gone()
        );
        assert!(!EngineError::Transport("connection refused".into()).is_session_gone());
        assert!(!EngineError::Protocol("missing field `data`".into()).is_session_gone());
    }

    #[test]
    fn message_shim_catches_legacy_error_text() {
        assert!(
            EngineError::Protocol("Execution context destroyed, most likely because of navigation"
                .into())
            .is_session_gone()
        );
        assert!(
            EngineError::Api {
                status: 500,
                message: "Session expired after idle timeout".into()
            }
            .is_session_gone()
        );
        assert!(EngineError::Transport("Target closed".into()).is_session_gone());
    }
}
