//! JSON result envelopes on stdout.

use serde::Serialize;
use serde_json::{Value, json};
use tether::{Error, KeepAliveStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

#[derive(Debug, Serialize)]
pub struct CommandError {
	pub code: String,
	pub message: String,
}

impl CommandResult {
	pub fn success(command: &str, data: Value) -> Self {
		Self {
			ok: true,
			command: command.to_string(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(command: &str, err: &anyhow::Error) -> Self {
		Self {
			ok: false,
			command: command.to_string(),
			data: None,
			error: Some(CommandError {
				code: error_code(err).to_string(),
				message: format!("{err:#}"),
			}),
		}
	}
}

/// Stable code for an error, derived from the session error kind when there is one.
pub fn error_code(err: &anyhow::Error) -> &'static str {
	match err.downcast_ref::<Error>() {
		Some(err) if err.is_not_authenticated() => "NOT_AUTHENTICATED",
		Some(err) if err.is_temporary() => "NETWORK",
		Some(Error::ProbeFailed(_)) => "PROBE_FAILED",
		Some(Error::Fault { .. }) => "FAULT",
		Some(_) => "PROTOCOL",
		None if err.downcast_ref::<tether::ConfigError>().is_some() => "CONFIG",
		None => "ERROR",
	}
}

pub fn keep_alive_json(status: &KeepAliveStatus) -> Value {
	json!({
		"phase": format!("{:?}", status.phase).to_lowercase(),
		"probes": status.probes,
		"activity": status.activity,
		"idleForMs": status.idle_for.as_millis() as u64,
		"lastError": status.last_error,
	})
}

pub fn print_result(result: &CommandResult) {
	match serde_json::to_string_pretty(result) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("failed to encode result: {err}"),
	}
}
