use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use sb_core::{CloudEngine, spawn_sweeper};
use sb_server::credentials::EnvCredentials;
use sb_server::state::AppState;
use sb_server::{cli::Cli, logging, routes};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let engine = Arc::new(CloudEngine::new(cli.engine_url.clone()));
	let state = AppState::new(engine, EnvCredentials::from_env());

	let sweeper = spawn_sweeper(
		Arc::clone(&state.store),
		cli.sweep_interval(),
		cli.idle_ttl(),
	);

	let addr: SocketAddr = format!("{}:{}", cli.host, cli.resolved_port())
		.parse()
		.with_context(|| format!("invalid listen address {}:{}", cli.host, cli.resolved_port()))?;
	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;

	info!(
		target: "sb.server",
		%addr,
		engine_url = %cli.engine_url,
		idle_ttl_secs = cli.idle_ttl,
		sweep_interval_secs = cli.sweep_interval,
		"stagebridge listening"
	);

	axum::serve(listener, routes::router(state.clone()))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error")?;

	// Drain: stop reclaiming, close every engine session, drop routes.
	sweeper.abort();
	state.shutdown().await;
	info!(target: "sb.server", "shutdown complete");

	Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = match signal(SignalKind::terminate()) {
		Ok(sig) => sig,
		Err(err) => {
			warn!(target: "sb.server", error = %err, "failed to install SIGTERM handler");
			let _ = tokio::signal::ctrl_c().await;
			return;
		}
	};

	tokio::select! {
		_ = sigterm.recv() => {
			info!(target: "sb.server", "received SIGTERM, shutting down");
		}
		_ = tokio::signal::ctrl_c() => {
			info!(target: "sb.server", "received Ctrl+C, shutting down");
		}
	}
}

#[cfg(not(unix))]
async fn shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
	info!(target: "sb.server", "received Ctrl+C, shutting down");
}
