//! Wire types for the stagebridge MCP protocol.
//!
//! This crate contains the serde-serializable types exchanged with clients
//! over the SSE + message-post transport. These types represent the
//! "protocol layer" - the shapes of data as they appear on the wire.
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with protocol**: JSON-RPC 2.0 envelopes plus MCP tool shapes
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Dispatch and transport live in `sb-server`; session bookkeeping in
//! `sb-core`.

pub mod envelope;
pub mod tools;

pub use envelope::*;
pub use tools::*;
