
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;

/// Root CLI for tether.
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "Authenticated RPC sessions with retry and keep-alive")]
#[command(version)]
#[command(styles = styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON client config; TETHER_* variables override it
	#[arg(short, long, global = true, value_name = "FILE", env = "TETHER_CONFIG")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a session against the in-process simulator.
	Simulate(SimulateArgs),
	/// Log in, verify the session, and log out.
	Check(RemoteArgs),
	/// Log in and keep the session alive for a while.
	Hold(HoldArgs),
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Simulate(_) => "simulate",
			Commands::Check(_) => "check",
			Commands::Hold(_) => "hold",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
	/// How long to leave the session idle
	#[arg(long, value_name = "MS", default_value_t = 3000)]
	pub duration_ms: u64,

	/// Server-side idle timeout for simulated sessions
	#[arg(long, value_name = "MS", default_value_t = 1500)]
	pub session_timeout_ms: u64,

	/// Keep-alive idle interval; overrides the config
	#[arg(long, value_name = "MS")]
	pub idle_interval_ms: Option<u64>,

	/// Fail this many requests with a connection reset first
	#[arg(long, value_name = "N", default_value_t = 0)]
	pub fail: usize,

	/// Run without the keep-alive supervisor
	#[arg(long)]
	pub no_keep_alive: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
	/// Session endpoint URL
	#[arg(long, value_name = "URL", env = "TETHER_ENDPOINT")]
	pub endpoint: String,

	/// User name; omit for an anonymous login
	#[arg(short, long, value_name = "NAME", conflicts_with = "token")]
	pub user: Option<String>,

	#[arg(long, value_name = "SECRET", env = "TETHER_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Log in with a bearer token instead of a password
	#[arg(long, value_name = "TOKEN", env = "TETHER_TOKEN", hide_env_values = true)]
	pub token: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct HoldArgs {
	#[command(flatten)]
	pub remote: RemoteArgs,

	/// How long to hold the session
	#[arg(long, value_name = "SECS", default_value_t = 60)]
	pub duration: u64,
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Green.on_default())
		.placeholder(AnsiColor::Blue.on_default())
}
