//! stagebridge server: SSE + message-post transport, protocol dispatch, and
//! the tool surface over the session layer in `sb-core`.

pub mod cli;
pub mod credentials;
pub mod dispatch;
pub mod logging;
pub mod routes;
pub mod screenshots;
pub mod state;
pub mod tools;
