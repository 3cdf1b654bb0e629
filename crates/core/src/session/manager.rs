//! Session orchestration: login, logout, lookup, liveness.

use std::sync::Arc;

use parking_lot::Mutex;
use tether_protocol::{Credentials, UserSession};
use tether_runtime::{KeepAlive, Result, Transport};
use tracing::{debug, info};

use crate::methods;

/// Owns the authenticated-session contract and the cached [`UserSession`].
///
/// The manager only depends on the [`Transport`] capability. When a
/// [`KeepAlive`] is attached, the first successful login starts it; nothing
/// in the manager ever stops it.
pub struct SessionManager {
	transport: Arc<dyn Transport>,
	keep_alive: Option<Arc<KeepAlive>>,
	locale: Option<String>,
	session: Mutex<Option<UserSession>>,
}

impl SessionManager {
	pub fn new(transport: Arc<dyn Transport>) -> Self {
		Self {
			transport,
			keep_alive: None,
			locale: None,
			session: Mutex::new(None),
		}
	}

	/// Attaches a supervisor to start on the first successful login.
	pub fn with_keep_alive(mut self, keep_alive: Arc<KeepAlive>) -> Self {
		self.keep_alive = Some(keep_alive);
		self
	}

	/// Locale sent with login calls.
	pub fn with_locale(mut self, locale: Option<String>) -> Self {
		self.locale = locale;
		self
	}

	/// Cached descriptor, without contacting the server.
	pub fn cached(&self) -> Option<UserSession> {
		self.session.lock().clone()
	}

	/// Drops the cached descriptor.
	pub fn reset(&self) {
		if self.session.lock().take().is_some() {
			debug!(target: "tether.session", "session cache cleared");
		}
	}

	/// Clears the cache if `result` carries a not-authenticated error.
	pub fn observe<T>(&self, result: Result<T>) -> Result<T> {
		if let Err(err) = &result {
			if err.is_not_authenticated() {
				debug!(target: "tether.session", error = %err, "server rejected session; invalidating cache");
				self.reset();
			}
		}
		result
	}

	/// Logs in and caches the returned session.
	///
	/// With `None`, the login call is still made, without user fields.
	pub async fn login(&self, credentials: Option<&Credentials>) -> Result<UserSession> {
		debug!(target: "tether.session", user = ?credentials.and_then(Credentials::username), "logging in");
		let result = methods::login(&*self.transport, credentials, self.locale.as_deref()).await;
		let session = self.observe(result)?;
		info!(target: "tether.session", user = %session.user_name, "logged in");
		Ok(self.adopt(session))
	}

	/// Logs out. The cache is cleared whether or not the server accepted the call.
	pub async fn logout(&self) -> Result<()> {
		let result = methods::logout(&*self.transport).await;
		self.reset();
		if result.is_ok() {
			info!(target: "tether.session", "logged out");
		}
		result
	}

	/// Returns the cached session, querying the server on a miss.
	pub async fn current_session(&self) -> Result<Option<UserSession>> {
		if let Some(session) = self.cached() {
			return Ok(Some(session));
		}

		let session = match methods::current_session(&*self.transport).await {
			Ok(session) => session,
			Err(err) if err.is_not_authenticated() => None,
			Err(err) => return Err(err),
		};
		if let Some(session) = &session {
			*self.session.lock() = Some(session.clone());
		}
		Ok(session)
	}

	/// Checks with the server that the cached session is still usable.
	///
	/// `Ok(false)` when nothing is cached or the server no longer knows the
	/// session; transport failures and unsupported-method faults are errors.
	pub async fn is_session_active(&self) -> Result<bool> {
		let Some(session) = self.cached() else {
			return Ok(false);
		};

		let active = match methods::session_is_active(&*self.transport, &session.key, &session.user_name).await {
			Ok(active) => active,
			Err(err) if err.is_not_authenticated() => false,
			Err(err) => return Err(err),
		};
		if !active {
			debug!(target: "tether.session", user = %session.user_name, "session no longer active");
			self.reset();
		}
		Ok(active)
	}

	pub async fn acquire_clone_ticket(&self) -> Result<String> {
		let result = methods::acquire_clone_ticket(&*self.transport).await;
		self.observe(result)
	}

	/// Redeems a clone ticket issued on another connection and caches the session.
	pub async fn clone_session(&self, ticket: &str) -> Result<UserSession> {
		let result = methods::clone_session(&*self.transport, ticket).await;
		let session = self.observe(result)?;
		info!(target: "tether.session", user = %session.user_name, "cloned session");
		Ok(self.adopt(session))
	}

	fn adopt(&self, session: UserSession) -> UserSession {
		*self.session.lock() = Some(session.clone());
		if let Some(keep_alive) = &self.keep_alive {
			keep_alive.start();
		}
		session
	}
}
