//! The assembled session client.
//!
//! [`Client`] stacks the decorators over a caller-supplied leaf transport and
//! hands the outermost layer to a [`SessionManager`]:
//!
//! ```text
//! Client ─▶ SessionManager ─▶ KeepAlive ─▶ RetryingTransport ─▶ leaf
//! ```
//!
//! It also implements [`Transport`] itself, so domain code can issue arbitrary
//! calls on the authenticated session and still feed the keep-alive timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tether_protocol::{Credentials, Request, UserSession};
use tether_runtime::{
	Backoff, Error, KeepAlive, KeepAliveStatus, ProbeHandler, Result, RetryPolicy, RetryingTransport, Transport,
	TransportFuture,
};
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::methods;
use crate::session::SessionManager;

/// Builder for [`Client`]; starts from [`ClientConfig::default`].
///
/// Durations set directly on the builder take precedence over the config and
/// keep their full precision.
pub struct ClientBuilder {
	leaf: Arc<dyn Transport>,
	config: ClientConfig,
	idle_interval: Option<Duration>,
	retry_backoff: Option<Duration>,
	probe_timeout: Option<Duration>,
	request_timeout: Option<Duration>,
	retry_policy: Option<RetryPolicy>,
	probe: Option<ProbeHandler>,
}

impl ClientBuilder {
	pub fn new(leaf: Arc<dyn Transport>) -> Self {
		Self {
			leaf,
			config: ClientConfig::default(),
			idle_interval: None,
			retry_backoff: None,
			probe_timeout: None,
			request_timeout: None,
			retry_policy: None,
			probe: None,
		}
	}

	/// Replaces the base settings; builder-level durations still win.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	pub fn idle_interval(mut self, interval: Duration) -> Self {
		self.idle_interval = Some(interval);
		self
	}

	/// Maximum retries for transient network errors.
	pub fn retry_count(mut self, retries: u32) -> Self {
		self.config.retry_count = retries;
		self
	}

	/// Fixed delay between retries; zero retries immediately.
	pub fn retry_backoff(mut self, delay: Duration) -> Self {
		self.retry_backoff = Some(delay);
		self
	}

	/// Full retry policy; overrides `retry_count` and `retry_backoff`.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = Some(policy);
		self
	}

	/// Keep-alive probe; defaults to [`methods::keep_alive_probe`].
	pub fn probe_handler(mut self, handler: ProbeHandler) -> Self {
		self.probe = Some(handler);
		self
	}

	pub fn probe_timeout(mut self, timeout: Duration) -> Self {
		self.probe_timeout = Some(timeout);
		self
	}

	/// Deadline for each foreground call, retries included.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);
		self
	}

	pub fn locale(mut self, locale: impl Into<String>) -> Self {
		self.config.locale = Some(locale.into());
		self
	}

	/// Validates the settings and assembles the chain.
	///
	/// Zero idle intervals, probe timeouts and request timeouts are rejected.
	pub fn build(self) -> std::result::Result<Client, ConfigError> {
		self.config.validate()?;
		let idle_interval = non_zero("idle interval", self.idle_interval.unwrap_or(self.config.idle_interval()))?;
		let probe_timeout = non_zero("probe timeout", self.probe_timeout.unwrap_or(self.config.probe_timeout()))?;
		let request_timeout = self
			.request_timeout
			.or(self.config.request_timeout())
			.map(|timeout| non_zero("request timeout", timeout))
			.transpose()?;
		let backoff = match self.retry_backoff {
			Some(delay) if delay.is_zero() => Backoff::Immediate,
			Some(delay) => Backoff::Fixed(delay),
			None => self.config.backoff(),
		};
		let policy = self
			.retry_policy
			.unwrap_or_else(|| RetryPolicy::temporary_network_error(self.config.retry_count).with_backoff(backoff));
		debug!(
			target: "tether.client",
			max_retries = policy.max_retries(),
			?idle_interval,
			"building client"
		);

		let retrying: Arc<dyn Transport> = Arc::new(RetryingTransport::new(self.leaf, policy));
		let probe = self.probe.unwrap_or_else(methods::keep_alive_probe);
		let keep_alive = Arc::new(KeepAlive::new(retrying, idle_interval, probe).with_probe_timeout(probe_timeout));
		let transport: Arc<dyn Transport> = keep_alive.clone();
		let sessions = SessionManager::new(Arc::clone(&transport))
			.with_keep_alive(Arc::clone(&keep_alive))
			.with_locale(self.config.locale);

		Ok(Client {
			sessions,
			keep_alive,
			transport,
			request_timeout,
		})
	}
}

fn non_zero(name: &str, value: Duration) -> std::result::Result<Duration, ConfigError> {
	if value.is_zero() {
		return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
	}
	Ok(value)
}

/// Session client over a decorated transport chain.
///
/// Dropping the client stops its keep-alive task.
pub struct Client {
	sessions: SessionManager,
	keep_alive: Arc<KeepAlive>,
	transport: Arc<dyn Transport>,
	request_timeout: Option<Duration>,
}

impl Client {
	/// Client with default configuration over `leaf`.
	pub fn new(leaf: Arc<dyn Transport>) -> std::result::Result<Self, ConfigError> {
		Self::builder(leaf).build()
	}

	pub fn builder(leaf: Arc<dyn Transport>) -> ClientBuilder {
		ClientBuilder::new(leaf)
	}

	pub fn sessions(&self) -> &SessionManager {
		&self.sessions
	}

	/// Logs in; the first success starts the keep-alive supervisor.
	pub async fn login(&self, credentials: Option<&Credentials>) -> Result<UserSession> {
		self.with_deadline(self.sessions.login(credentials)).await
	}

	pub async fn login_by_token(&self, token: &str) -> Result<UserSession> {
		self.login(Some(&Credentials::token(token))).await
	}

	/// Logs out; the supervisor keeps running so the client can log in again.
	pub async fn logout(&self) -> Result<()> {
		let result = self.with_deadline(self.sessions.logout()).await;
		// A deadline can cut the call short before the manager clears its cache.
		self.sessions.reset();
		result
	}

	pub async fn current_session(&self) -> Result<Option<UserSession>> {
		self.with_deadline(self.sessions.current_session()).await
	}

	pub async fn is_session_active(&self) -> Result<bool> {
		self.with_deadline(self.sessions.is_session_active()).await
	}

	pub async fn acquire_clone_ticket(&self) -> Result<String> {
		self.with_deadline(self.sessions.acquire_clone_ticket()).await
	}

	pub async fn clone_session(&self, ticket: &str) -> Result<UserSession> {
		self.with_deadline(self.sessions.clone_session(ticket)).await
	}

	/// Sends an arbitrary call on the session.
	///
	/// A not-authenticated reply invalidates the cached session.
	pub async fn send(&self, request: Request) -> Result<Value> {
		let result = self.with_deadline(self.transport.send(request)).await;
		self.sessions.observe(result)
	}

	pub fn keep_alive_status(&self) -> KeepAliveStatus {
		self.keep_alive.status()
	}

	/// Stops the keep-alive supervisor permanently.
	pub fn shutdown(&self) {
		self.keep_alive.shutdown();
	}

	/// Forgets the cached session without contacting the server.
	pub fn reset(&self) {
		self.sessions.reset();
	}

	async fn with_deadline<T, F>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		match self.request_timeout {
			Some(timeout) => tokio::time::timeout(timeout, fut).await.map_err(|_| Error::Timeout(timeout))?,
			None => fut.await,
		}
	}
}

impl Transport for Client {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(Client::send(self, request))
	}
}
