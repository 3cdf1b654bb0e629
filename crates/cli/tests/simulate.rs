//! End-to-end runs of the `tether` binary and command dispatch against the simulator.

use std::process::Command;

use clap::Parser;
use serde_json::Value;
use tempfile::tempdir;
use tether_cli::cli::Cli;
use tether_cli::commands;

fn run(args: &[&str]) -> (Value, bool) {
	let output = Command::new(env!("CARGO_BIN_EXE_tether"))
		.args(args)
		.env_remove("RUST_LOG")
		.env_remove("TETHER_CONFIG")
		.output()
		.expect("failed to execute tether");

	let stdout = String::from_utf8_lossy(&output.stdout);
	let parsed = serde_json::from_str(&stdout).unwrap_or_else(|_| panic!("stdout is not JSON: {stdout}"));
	(parsed, output.status.success())
}

fn parse(args: &[&str]) -> Cli {
	Cli::try_parse_from(std::iter::once("tether").chain(args.iter().copied())).unwrap()
}

#[test]
fn simulate_with_keep_alive_reports_active_session() {
	let (result, success) = run(&[
		"simulate",
		"--duration-ms",
		"400",
		"--session-timeout-ms",
		"300",
		"--idle-interval-ms",
		"50",
	]);

	assert!(success);
	assert_eq!(result["ok"], true);
	assert_eq!(result["command"], "simulate");
	assert_eq!(result["data"]["active"], true);
	assert!(result["data"]["probes"].as_u64().unwrap() >= 1);
}

#[test]
fn bad_config_file_fails_with_config_code() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("tether.json");
	std::fs::write(&path, "{ not json").unwrap();

	let (result, success) = run(&["--config", path.to_str().unwrap(), "simulate", "--duration-ms", "1"]);

	assert!(!success);
	assert_eq!(result["ok"], false);
	assert_eq!(result["error"]["code"], "CONFIG");
}

#[tokio::test(start_paused = true)]
async fn simulated_session_expires_without_keep_alive() {
	let cli = parse(&["simulate", "--duration-ms", "3000", "--session-timeout-ms", "1000", "--no-keep-alive"]);

	let data = commands::dispatch(cli).await.unwrap();

	assert_eq!(data["active"], false);
	assert_eq!(data["probes"], 0);
	assert_eq!(data["keepAlive"]["phase"], "stopped");
}

#[tokio::test(start_paused = true)]
async fn simulated_failures_are_retried() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("tether.json");
	std::fs::write(&path, r#"{"retryCount": 5, "idleIntervalMs": 200}"#).unwrap();
	let cli = parse(&[
		"--config",
		path.to_str().unwrap(),
		"simulate",
		"--duration-ms",
		"1000",
		"--fail",
		"4",
	]);

	let data = commands::dispatch(cli).await.unwrap();

	assert_eq!(data["loginAttempts"], 5);
	assert_eq!(data["active"], true);
	assert_eq!(data["keepAlive"]["phase"], "armed");
	assert!(data["keepAlive"]["probes"].as_u64().unwrap() >= 4);
}

#[tokio::test]
async fn zero_idle_interval_is_a_config_error() {
	let cli = parse(&["simulate", "--idle-interval-ms", "0"]);

	let err = commands::dispatch(cli).await.unwrap_err();

	assert_eq!(tether_cli::output::error_code(&err), "CONFIG");
	assert!(err.to_string().contains("idle interval"));
}
