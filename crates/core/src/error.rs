//! Error types for the session layer.

use thiserror::Error;

use crate::engine::EngineError;

/// Result type alias for session-layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session store and connection registry.
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration fields were absent. Raised before any
    /// construction attempt.
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    /// The engine failed while creating, probing, or driving a session.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A stream session id was registered twice. Ids are generated fresh at
    /// stream-open, so a collision is a program error, never overwritten.
    #[error("session id already registered: {0}")]
    DuplicateSessionId(String),
}
