//! Command implementations. Each returns the `data` payload of its result.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tether::{Client, ClientConfig, Credentials, HttpTransport, Simulator, method};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands, HoldArgs, RemoteArgs, SimulateArgs};
use crate::output::keep_alive_json;

pub async fn dispatch(cli: Cli) -> Result<Value> {
	let config = load_config(cli.config.as_deref())?;
	match cli.command {
		Commands::Simulate(args) => simulate(config, args).await,
		Commands::Check(args) => check(config, args).await,
		Commands::Hold(args) => hold(config, args).await,
	}
}

/// Config file (or defaults) with `TETHER_*` overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
	let config = match path {
		Some(path) => ClientConfig::load(path)?.with_env()?,
		None => ClientConfig::from_env()?,
	};
	Ok(config)
}

async fn simulate(config: ClientConfig, args: SimulateArgs) -> Result<Value> {
	let sim = Simulator::new().with_idle_timeout(Duration::from_millis(args.session_timeout_ms));
	let mut builder = Client::builder(Arc::new(sim.connect())).config(config);
	if let Some(ms) = args.idle_interval_ms {
		builder = builder.idle_interval(Duration::from_millis(ms));
	}
	let client = builder.build()?;
	if args.no_keep_alive {
		client.shutdown();
	}

	sim.fail_next(args.fail);
	let session = client.login(Some(&Credentials::password("user", "pass"))).await?;
	info!(target: "tether.cli", key = %session.key, "simulated login");

	tokio::time::sleep(Duration::from_millis(args.duration_ms)).await;

	let active = client.is_session_active().await?;
	let keep_alive = keep_alive_json(&client.keep_alive_status());
	if active {
		client.logout().await?;
	}
	client.shutdown();

	Ok(json!({
		"user": session.user_name,
		"active": active,
		"keepAlive": keep_alive,
		"loginAttempts": sim.request_count(method::LOGIN),
		"probes": sim.request_count(method::CURRENT_TIME),
		"requests": sim.requests().len(),
	}))
}

async fn check(config: ClientConfig, args: RemoteArgs) -> Result<Value> {
	let client = connect(config, &args)?;
	let credentials = credentials(&args)?;

	let session = client.login(credentials.as_ref()).await.context("login failed")?;
	let current = client.current_session().await?;
	let active = match client.is_session_active().await {
		Ok(active) => Some(active),
		Err(err) if err.fault_name() == Some("NotSupported") => {
			debug!(target: "tether.cli", "server does not support SessionIsActive");
			None
		}
		Err(err) => return Err(err.into()),
	};
	client.logout().await.context("logout failed")?;
	client.shutdown();

	Ok(json!({
		"endpoint": args.endpoint,
		"session": session,
		"current": current,
		"active": active,
	}))
}

async fn hold(config: ClientConfig, args: HoldArgs) -> Result<Value> {
	let client = connect(config, &args.remote)?;
	let credentials = credentials(&args.remote)?;

	let session = client.login(credentials.as_ref()).await.context("login failed")?;
	info!(target: "tether.cli", user = %session.user_name, secs = args.duration, "holding session");

	let interrupted = tokio::select! {
		() = tokio::time::sleep(Duration::from_secs(args.duration)) => false,
		signal = tokio::signal::ctrl_c() => {
			signal.context("failed to listen for ctrl-c")?;
			true
		}
	};

	let mut data = release(&client).await;
	data["endpoint"] = json!(args.remote.endpoint);
	data["user"] = json!(session.user_name);
	data["interrupted"] = json!(interrupted);
	Ok(data)
}

/// Final liveness check and logout at the end of a hold.
///
/// Failures are logged and reported in the returned object. Logout is
/// attempted unless the server confirmed the session is already gone.
async fn release(client: &Client) -> Value {
	let status = client.keep_alive_status();
	if let Some(err) = &status.last_error {
		warn!(target: "tether.cli", error = %err, "keep-alive stopped while holding");
	}

	let (active, active_error) = match client.is_session_active().await {
		Ok(active) => (Some(active), None),
		Err(err) => {
			warn!(target: "tether.cli", error = %err, "liveness check failed");
			(None, Some(err.to_string()))
		}
	};
	let logout_error = match active {
		Some(false) => None,
		_ => match client.logout().await {
			Ok(()) => None,
			Err(err) => {
				warn!(target: "tether.cli", error = %err, "logout failed");
				Some(err.to_string())
			}
		},
	};
	client.shutdown();

	json!({
		"active": active,
		"activeError": active_error,
		"loggedOut": active != Some(false) && logout_error.is_none(),
		"logoutError": logout_error,
		"keepAlive": keep_alive_json(&status),
	})
}

fn connect(config: ClientConfig, args: &RemoteArgs) -> Result<Client> {
	let leaf = HttpTransport::with_timeout(&args.endpoint, config.request_timeout())
		.with_context(|| format!("invalid endpoint {}", args.endpoint))?;
	Ok(Client::builder(Arc::new(leaf)).config(config).build()?)
}

fn credentials(args: &RemoteArgs) -> Result<Option<Credentials>> {
	match (&args.user, &args.password, &args.token) {
		(_, _, Some(token)) => Ok(Some(Credentials::token(token))),
		(Some(user), Some(password), None) => Ok(Some(Credentials::password(user, password))),
		(Some(user), None, None) => bail!("no password for {user}; pass --password or set TETHER_PASSWORD"),
		(None, _, None) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn logged_in(sim: &Simulator) -> Client {
		let client = Client::builder(Arc::new(sim.connect())).retry_count(0).build().unwrap();
		client.login(Some(&Credentials::password("user", "pass"))).await.unwrap();
		client
	}

	fn remote(user: Option<&str>, password: Option<&str>, token: Option<&str>) -> RemoteArgs {
		RemoteArgs {
			endpoint: "http://localhost/rpc".into(),
			user: user.map(String::from),
			password: password.map(String::from),
			token: token.map(String::from),
		}
	}

	#[test]
	fn credentials_prefer_token() {
		let creds = credentials(&remote(None, Some("ignored"), Some("tok"))).unwrap();
		assert!(matches!(creds, Some(Credentials::Token { .. })));
	}

	#[test]
	fn credentials_require_password_for_user() {
		let err = credentials(&remote(Some("admin"), None, None)).unwrap_err();
		assert!(err.to_string().contains("TETHER_PASSWORD"));
	}

	#[test]
	fn no_user_means_anonymous() {
		assert!(credentials(&remote(None, None, None)).unwrap().is_none());
	}

	#[tokio::test]
	async fn release_logs_out_after_failed_liveness_check() {
		let sim = Simulator::new();
		let client = logged_in(&sim).await;

		sim.fail_next(1);
		let data = release(&client).await;

		assert_eq!(data["active"], Value::Null);
		assert!(data["activeError"].as_str().unwrap().contains("connection reset"));
		assert_eq!(data["loggedOut"], true);
		assert_eq!(data["logoutError"], Value::Null);
		assert_eq!(sim.request_count(method::LOGOUT), 1);
		assert_eq!(sim.session_count(), 0);
	}

	#[tokio::test]
	async fn release_reports_logout_failure() {
		let sim = Simulator::new();
		let client = logged_in(&sim).await;

		sim.set_offline(true);
		let data = release(&client).await;

		assert!(data["activeError"].is_string());
		assert!(data["logoutError"].is_string());
		assert_eq!(data["loggedOut"], false);
		assert_eq!(sim.session_count(), 1);
	}

	#[tokio::test]
	async fn release_skips_logout_for_vanished_session() {
		let sim = Simulator::new();
		let client = logged_in(&sim).await;

		sim.terminate_all();
		let data = release(&client).await;

		assert_eq!(data["active"], false);
		assert_eq!(data["loggedOut"], false);
		assert_eq!(sim.request_count(method::LOGOUT), 0);
	}
}
