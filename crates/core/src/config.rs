//! Client configuration: [`ClientConfig`].
//!
//! Loaded from a JSON file, overridden from `TETHER_*` environment variables,
//! and finally from [`ClientBuilder`](crate::ClientBuilder) calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_runtime::{Backoff, DEFAULT_IDLE_INTERVAL, DEFAULT_PROBE_TIMEOUT, DEFAULT_RETRY_COUNT};
use thiserror::Error;

pub const ENV_IDLE_INTERVAL_MS: &str = "TETHER_IDLE_INTERVAL_MS";
pub const ENV_RETRY_COUNT: &str = "TETHER_RETRY_COUNT";
pub const ENV_RETRY_BACKOFF_MS: &str = "TETHER_RETRY_BACKOFF_MS";
pub const ENV_PROBE_TIMEOUT_MS: &str = "TETHER_PROBE_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TETHER_REQUEST_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {path}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {path}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("invalid value '{value}' for {key}")]
	InvalidValue { key: &'static str, value: String },

	#[error("{0}")]
	Invalid(String),
}

/// Session client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
	/// Idle time before the keep-alive probe fires.
	pub idle_interval_ms: u64,
	/// Maximum retries for transient network errors.
	pub retry_count: u32,
	/// Fixed delay between retries; 0 retries immediately.
	pub retry_backoff_ms: u64,
	/// Deadline for a single keep-alive probe.
	pub probe_timeout_ms: u64,
	/// Deadline for a foreground call, retries included.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_timeout_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub locale: Option<String>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			idle_interval_ms: DEFAULT_IDLE_INTERVAL.as_millis() as u64,
			retry_count: DEFAULT_RETRY_COUNT,
			retry_backoff_ms: 0,
			probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
			request_timeout_ms: None,
			locale: None,
		}
	}
}

impl ClientConfig {
	/// Reads a JSON config file; missing keys take their defaults.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		config.validate()?;
		Ok(config)
	}

	/// Defaults with `TETHER_*` environment overrides applied.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::default().with_env()
	}

	/// Applies `TETHER_*` environment overrides.
	pub fn with_env(self) -> Result<Self, ConfigError> {
		self.with_overrides(|key| std::env::var(key).ok())
	}

	/// Applies overrides from `lookup`, keyed by the `ENV_*` names.
	pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(value) = parse_var(&lookup, ENV_IDLE_INTERVAL_MS)? {
			self.idle_interval_ms = value;
		}
		if let Some(value) = parse_var(&lookup, ENV_RETRY_COUNT)? {
			self.retry_count = value;
		}
		if let Some(value) = parse_var(&lookup, ENV_RETRY_BACKOFF_MS)? {
			self.retry_backoff_ms = value;
		}
		if let Some(value) = parse_var(&lookup, ENV_PROBE_TIMEOUT_MS)? {
			self.probe_timeout_ms = value;
		}
		if let Some(value) = parse_var(&lookup, ENV_REQUEST_TIMEOUT_MS)? {
			self.request_timeout_ms = Some(value);
		}
		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.idle_interval_ms == 0 {
			return Err(ConfigError::Invalid("idleIntervalMs must be greater than zero".into()));
		}
		if self.probe_timeout_ms == 0 {
			return Err(ConfigError::Invalid("probeTimeoutMs must be greater than zero".into()));
		}
		if self.request_timeout_ms == Some(0) {
			return Err(ConfigError::Invalid("requestTimeoutMs must be greater than zero".into()));
		}
		Ok(())
	}

	pub fn idle_interval(&self) -> Duration {
		Duration::from_millis(self.idle_interval_ms)
	}

	pub fn probe_timeout(&self) -> Duration {
		Duration::from_millis(self.probe_timeout_ms)
	}

	pub fn request_timeout(&self) -> Option<Duration> {
		self.request_timeout_ms.map(Duration::from_millis)
	}

	pub fn backoff(&self) -> Backoff {
		match self.retry_backoff_ms {
			0 => Backoff::Immediate,
			ms => Backoff::Fixed(Duration::from_millis(ms)),
		}
	}
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: std::str::FromStr,
{
	match lookup(key) {
		None => Ok(None),
		Some(raw) => raw
			.trim()
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::InvalidValue { key, value: raw }),
	}
}
