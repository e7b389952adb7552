use std::time::Duration;

use clap::Parser;

use sb_core::{DEFAULT_ENGINE_URL, DEFAULT_IDLE_TTL, DEFAULT_SWEEP_INTERVAL};

/// Fixed fallback when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3000;

/// Root CLI for the stagebridge server.
#[derive(Parser, Debug)]
#[command(name = "stagebridge")]
#[command(about = "MCP server bridging SSE clients to a cloud browser automation engine")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Address to listen on.
	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Port to listen on. Falls back to $PORT, then 3000.
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Base URL of the cloud automation engine API.
	#[arg(long, default_value = DEFAULT_ENGINE_URL)]
	pub engine_url: String,

	/// Seconds a session may sit idle before the sweeper reclaims it.
	#[arg(long, default_value_t = DEFAULT_IDLE_TTL.as_secs())]
	pub idle_ttl: u64,

	/// Seconds between reclamation passes.
	#[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
	pub sweep_interval: u64,
}

impl Cli {
	/// Resolves the listening port: flag, then `PORT` env, then the default.
	pub fn resolved_port(&self) -> u16 {
		self.port
			.or_else(|| std::env::var("PORT").ok()?.parse().ok())
			.unwrap_or(DEFAULT_PORT)
	}

	pub fn idle_ttl(&self) -> Duration {
		Duration::from_secs(self.idle_ttl)
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval)
	}
}
