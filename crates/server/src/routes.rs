//! HTTP surface: stream-open, message-post, and health.
//!
//! The stream side allocates a session id and registers the connection
//! *before* the handshake event reaches the client, so a post can never race
//! an unknown id. The post side correlates purely on the `sessionId` query
//! parameter and feeds the dispatcher; responses travel back over the
//! matched stream, never the POST body.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{get, post};
use futures::{Stream, StreamExt, stream};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sb_core::ConnectionRegistry;
use sb_protocol::{Request, Response, RpcError};

use crate::credentials;
use crate::dispatch;
use crate::state::{AppState, StreamConnection};

/// Capacity of each stream's outbound queue.
const STREAM_BUFFER: usize = 32;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/sse", get(open_stream))
		.route("/messages", post(post_message))
		.route("/health", get(health))
		.with_state(state)
}

async fn health() -> &'static str {
	"ok"
}

/// Stream-open handshake: resolve credentials, allocate a session id,
/// register, then answer with the event stream.
async fn open_stream(
	State(state): State<AppState>,
	Query(query): Query<HashMap<String, String>>,
	headers: HeaderMap,
) -> HttpResponse {
	let config = match credentials::resolve(&query, &headers, &state.env) {
		Ok(config) => config,
		Err(err) => {
			debug!(target: "sb.http", error = %err, "stream handshake rejected");
			return (
				StatusCode::UNAUTHORIZED,
				credentials::unauthorized_message(),
			)
				.into_response();
		}
	};

	let session_id = Uuid::new_v4().to_string();
	let (tx, rx) = mpsc::channel(STREAM_BUFFER);

	// Must happen before the endpoint event is acknowledged: a fast client
	// may post the instant it learns its session id.
	if let Err(err) = state.registry.register(&session_id, StreamConnection { tx, config }) {
		error!(target: "sb.http", session_id, error = %err, "stream registration failed");
		return (StatusCode::INTERNAL_SERVER_ERROR, "session id collision").into_response();
	}
	info!(
		target: "sb.http",
		session_id,
		streams = state.registry.len(),
		"stream connection opened"
	);

	let endpoint = Event::default()
		.event("endpoint")
		.data(format!("/messages?sessionId={session_id}"));

	let outbound_id = session_id.clone();
	let messages = ReceiverStream::new(rx).filter_map(move |response: Response| {
		let session_id = outbound_id.clone();
		async move {
			match serde_json::to_string(&response) {
				Ok(payload) => Some(Ok::<_, Infallible>(
					Event::default().event("message").data(payload),
				)),
				Err(err) => {
					warn!(target: "sb.http", session_id = %session_id, error = %err, "response serialization failed");
					None
				}
			}
		}
	});

	let body = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages);
	let guarded = StreamGuard {
		inner: Box::pin(body),
		registry: Arc::clone(&state.registry),
		session_id,
	};

	let sse = Sse::new(guarded).keep_alive(KeepAlive::default());
	([(header::CACHE_CONTROL, "no-cache")], sse).into_response()
}

/// Message-post: correlate on `sessionId`, dispatch, reply over the stream.
async fn post_message(
	State(state): State<AppState>,
	Query(query): Query<HashMap<String, String>>,
	body: Bytes,
) -> HttpResponse {
	let Some(session_id) = query.get("sessionId") else {
		return (
			StatusCode::BAD_REQUEST,
			"Missing sessionId query parameter",
		)
			.into_response();
	};

	// A post can legitimately outlive its stream; absence is routine.
	let Some(connection) = state.registry.lookup(session_id) else {
		debug!(target: "sb.http", session_id, "post for unknown or closed stream");
		return (
			StatusCode::SERVICE_UNAVAILABLE,
			format!("No active SSE connection for session {session_id}"),
		)
			.into_response();
	};

	let request: Request = match serde_json::from_slice(&body) {
		Ok(request) => request,
		Err(err) => {
			let response = Response::failure(Value::Null, RpcError::parse_error(err));
			deliver(&connection, response, session_id).await;
			return (StatusCode::ACCEPTED, "Accepted").into_response();
		}
	};

	if let Some(response) = dispatch::dispatch(&state, &connection.config, request).await {
		deliver(&connection, response, session_id).await;
	}
	(StatusCode::ACCEPTED, "Accepted").into_response()
}

/// Writes a response onto the matched stream. The stream may have closed
/// while the operation ran; that is a benign no-op, not an error.
async fn deliver(connection: &StreamConnection, response: Response, session_id: &str) {
	if connection.tx.send(response).await.is_err() {
		debug!(
			target: "sb.http",
			session_id,
			"stream closed before response delivery"
		);
	}
}

/// Stream wrapper that deregisters its session id exactly once, on the first
/// of explicit close, transport error, or client disconnect. Removal is
/// idempotent, so racing teardown paths are harmless.
struct StreamGuard {
	inner: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
	registry: Arc<ConnectionRegistry<StreamConnection>>,
	session_id: String,
}

impl Stream for StreamGuard {
	type Item = Result<Event, Infallible>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.inner.as_mut().poll_next(cx)
	}
}

impl Drop for StreamGuard {
	fn drop(&mut self) {
		if self.registry.remove(&self.session_id) {
			info!(
				target: "sb.http",
				session_id = %self.session_id,
				"stream connection closed"
			);
		}
	}
}
