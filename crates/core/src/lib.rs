//! Session correlation and lifecycle layer for stagebridge.
//!
//! Two stores anchor the server, with deliberately disjoint key spaces:
//!
//! - [`SessionStore`] maps a credential *fingerprint* to one live engine
//!   session, owning creation, liveness validation, refresh, and time-based
//!   reclamation. At most one live session exists per fingerprint.
//! - [`ConnectionRegistry`] maps a transport *session id* to one open event
//!   stream, so replies posted on the message channel reach the stream that
//!   owns them.
//!
//! A stream connection lives as long as one network connection; an engine
//! session may outlive many of them (reconnects reuse the warm session).
//! The engine itself sits behind the [`engine::Engine`] trait so the stores
//! can be exercised without network access.

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;

pub use config::{Fingerprint, SessionConfig};
pub use engine::{CloudEngine, DEFAULT_ENGINE_URL, Engine, EngineError, EngineSession};
pub use error::{Error, Result};
pub use registry::ConnectionRegistry;
pub use store::{DEFAULT_IDLE_TTL, DEFAULT_SWEEP_INTERVAL, SessionStore, spawn_sweeper};
