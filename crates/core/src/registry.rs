//! Connection registry: stream session id to open connection.
//!
//! Populated when an event stream opens, purged on the first of close,
//! transport error, or client disconnect. Removal is idempotent because
//! those paths race each other; a second removal is a no-op. The registry is
//! generic over the connection type so the transport layer decides what a
//! "connection" carries.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Concurrency-safe map from stream session id to connection.
pub struct ConnectionRegistry<C> {
    connections: Mutex<HashMap<String, C>>,
}

impl<C: Clone> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a freshly opened connection under `session_id`.
    ///
    /// Session ids are generated at stream-open and never reused while
    /// mapped, so an occupied entry is an id collision: it fails loudly
    /// instead of silently overwriting a live stream.
    pub fn register(&self, session_id: &str, connection: C) -> Result<()> {
        let mut connections = self.connections.lock();
        if connections.contains_key(session_id) {
            return Err(Error::DuplicateSessionId(session_id.to_string()));
        }
        connections.insert(session_id.to_string(), connection);
        debug!(target: "sb.registry", session_id, "stream connection registered");
        Ok(())
    }

    /// Looks up the connection owning `session_id`.
    ///
    /// Absence is a normal outcome (a post can arrive after disconnect),
    /// not an error.
    pub fn lookup(&self, session_id: &str) -> Option<C> {
        self.connections.lock().get(session_id).cloned()
    }

    /// Removes `session_id`. Idempotent: removing an absent id is a no-op.
    /// Returns whether an entry was actually removed.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.connections.lock().remove(session_id).is_some();
        if removed {
            debug!(target: "sb.registry", session_id, "stream connection removed");
        }
        removed
    }

    /// Drops every entry. Used at shutdown.
    pub fn clear(&self) {
        self.connections.lock().clear();
    }

    /// Number of currently-open streams.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl<C: Clone> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
