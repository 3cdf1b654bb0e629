//! In-process session server for tests and demos.
//!
//! A [`Simulator`] holds server-side state (accounts, live sessions, clone
//! tickets); each [`SimTransport`] from [`Simulator::connect`] is one client
//! connection with its own session key, the way a cookie jar binds a session
//! to one HTTP connection. Sessions idle for longer than the configured
//! timeout expire on the next request that touches them.
//!
//! Faults can be injected: transient failures for the next N requests, an
//! offline switch, and a server edition without `SessionIsActive`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tether_protocol::{
	CloneSessionParams, Fault, LoginByTokenParams, LoginParams, Request, SessionIsActiveParams, UserSession,
	fault_name, method,
};
use tether_runtime::{Error, Result, Transport, TransportFuture};
use tokio::time::Instant;
use tracing::trace;

/// Idle timeout of simulated sessions unless configured otherwise.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy)]
enum Failure {
	Reset,
	Timeout,
}

struct SimSession {
	descriptor: UserSession,
	last_active: Instant,
}

struct Server {
	users: HashMap<String, String>,
	tokens: HashMap<String, String>,
	sessions: HashMap<String, SimSession>,
	tickets: HashMap<String, String>,
	idle_timeout: Duration,
	session_is_active_supported: bool,
	failures: VecDeque<Failure>,
	offline: bool,
	requests: Vec<String>,
	next_id: u64,
}

/// Shared server state; cheap to clone.
#[derive(Clone)]
pub struct Simulator {
	server: Arc<Mutex<Server>>,
}

impl Default for Simulator {
	fn default() -> Self {
		Self::new()
	}
}

impl Simulator {
	/// Server with one account, `user` / `pass`.
	pub fn new() -> Self {
		Self {
			server: Arc::new(Mutex::new(Server {
				users: HashMap::from([("user".to_string(), "pass".to_string())]),
				tokens: HashMap::new(),
				sessions: HashMap::new(),
				tickets: HashMap::new(),
				idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
				session_is_active_supported: true,
				failures: VecDeque::new(),
				offline: false,
				requests: Vec::new(),
				next_id: 0,
			})),
		}
	}

	pub fn with_user(self, name: &str, password: &str) -> Self {
		self.server.lock().users.insert(name.to_string(), password.to_string());
		self
	}

	/// Accepts `token` in a token login as `user`.
	pub fn with_token(self, token: &str, user: &str) -> Self {
		self.server.lock().tokens.insert(token.to_string(), user.to_string());
		self
	}

	pub fn with_idle_timeout(self, timeout: Duration) -> Self {
		self.server.lock().idle_timeout = timeout;
		self
	}

	/// Behaves like a server edition that lacks `SessionIsActive`.
	pub fn without_session_is_active(self) -> Self {
		self.server.lock().session_is_active_supported = false;
		self
	}

	/// Opens a new client connection with no session.
	pub fn connect(&self) -> SimTransport {
		SimTransport {
			server: self.clone(),
			session_key: Mutex::new(None),
		}
	}

	/// Fails the next `count` requests with a connection reset.
	pub fn fail_next(&self, count: usize) {
		self.server.lock().failures.extend(std::iter::repeat_n(Failure::Reset, count));
	}

	/// Fails the next `count` requests with a timeout.
	pub fn time_out_next(&self, count: usize) {
		self.server.lock().failures.extend(std::iter::repeat_n(Failure::Timeout, count));
	}

	/// While offline every request fails with a connection reset.
	pub fn set_offline(&self, offline: bool) {
		self.server.lock().offline = offline;
	}

	/// Drops every live session, as an administrator or a server restart would.
	pub fn terminate_all(&self) {
		self.server.lock().sessions.clear();
	}

	pub fn terminate(&self, key: &str) -> bool {
		self.server.lock().sessions.remove(key).is_some()
	}

	/// Number of live (possibly idle-expired but not yet reaped) sessions.
	pub fn session_count(&self) -> usize {
		self.server.lock().sessions.len()
	}

	/// Every method received so far, failed attempts included.
	pub fn requests(&self) -> Vec<String> {
		self.server.lock().requests.clone()
	}

	pub fn request_count(&self, method: &str) -> usize {
		self.server.lock().requests.iter().filter(|m| *m == method).count()
	}

	fn handle(&self, key: &mut Option<String>, request: Request) -> Result<Value> {
		let mut server = self.server.lock();
		trace!(target: "tether.sim", method = %request.method, "request");
		server.requests.push(request.method.clone());

		if server.offline {
			return Err(Error::transient("simulated connection reset (offline)"));
		}
		match server.failures.pop_front() {
			Some(Failure::Reset) => return Err(Error::transient("simulated connection reset")),
			Some(Failure::Timeout) => return Err(Error::Timeout(Duration::from_secs(30))),
			None => {}
		}

		server.reap(key.as_deref());
		server.dispatch(key, request)
	}
}

impl Server {
	/// Removes the caller's session if it sat idle past the timeout.
	fn reap(&mut self, key: Option<&str>) {
		let Some(key) = key else { return };
		let expired = self
			.sessions
			.get(key)
			.is_some_and(|session| session.last_active.elapsed() > self.idle_timeout);
		if expired {
			trace!(target: "tether.sim", key, "session expired");
			self.sessions.remove(key);
		}
	}

	/// Touches and returns the caller's live session.
	fn authenticated(&mut self, key: Option<&str>) -> Result<&mut SimSession> {
		let session = key
			.and_then(|key| self.sessions.get_mut(key))
			.ok_or_else(|| Error::from(Fault::not_authenticated("The session is not authenticated.")))?;
		session.last_active = Instant::now();
		session.descriptor.last_active_time = epoch_secs();
		Ok(session)
	}

	fn open_session(&mut self, user: &str, locale: Option<String>) -> UserSession {
		self.next_id += 1;
		let now = epoch_secs();
		let descriptor = UserSession {
			key: format!("sim-session-{:04}", self.next_id),
			user_name: user.to_string(),
			full_name: None,
			login_time: now,
			last_active_time: now,
			locale: locale.clone().unwrap_or_else(|| "en".to_string()),
			message_locale: locale.unwrap_or_else(|| "en".to_string()),
		};
		self.sessions.insert(
			descriptor.key.clone(),
			SimSession {
				descriptor: descriptor.clone(),
				last_active: Instant::now(),
			},
		);
		descriptor
	}

	fn dispatch(&mut self, key: &mut Option<String>, request: Request) -> Result<Value> {
		match request.method.as_str() {
			method::LOGIN => {
				let params: LoginParams = params(request.params)?;
				let user = match (params.user_name, params.password) {
					(Some(user), password) => {
						if self.users.get(&user) != password.as_ref() {
							return Err(invalid_login());
						}
						user
					}
					// Pre-authenticated connection: hand back the existing session.
					(None, _) if key.as_deref().is_some_and(|k| self.sessions.contains_key(k)) => {
						return Ok(json!(self.authenticated(key.as_deref())?.descriptor));
					}
					(None, _) => "anonymous".to_string(),
				};
				let session = self.open_session(&user, params.locale);
				*key = Some(session.key.clone());
				Ok(json!(session))
			}
			method::LOGIN_BY_TOKEN => {
				let params: LoginByTokenParams = params(request.params)?;
				let user = self.tokens.get(&params.token).cloned().ok_or_else(invalid_login)?;
				let session = self.open_session(&user, params.locale);
				*key = Some(session.key.clone());
				Ok(json!(session))
			}
			method::LOGOUT => {
				self.authenticated(key.as_deref())?;
				if let Some(key) = key.take() {
					self.sessions.remove(&key);
				}
				Ok(Value::Null)
			}
			method::CURRENT_SESSION => match self.authenticated(key.as_deref()) {
				Ok(session) => Ok(json!(session.descriptor)),
				Err(_) => Ok(Value::Null),
			},
			method::SESSION_IS_ACTIVE => {
				self.authenticated(key.as_deref())?;
				if !self.session_is_active_supported {
					return Err(Error::from(Fault::new(
						fault_name::NOT_SUPPORTED,
						"SessionIsActive is not supported by this server",
					)));
				}
				let params: SessionIsActiveParams = params(request.params)?;
				self.reap(Some(&params.session_id));
				let active = self
					.sessions
					.get(&params.session_id)
					.is_some_and(|s| s.descriptor.user_name == params.user_name);
				Ok(json!(active))
			}
			method::CURRENT_TIME => {
				self.authenticated(key.as_deref())?;
				Ok(json!(epoch_secs()))
			}
			method::ACQUIRE_CLONE_TICKET => {
				let user = self.authenticated(key.as_deref())?.descriptor.user_name.clone();
				self.next_id += 1;
				let ticket = format!("sim-ticket-{:04}", self.next_id);
				self.tickets.insert(ticket.clone(), user);
				Ok(json!(ticket))
			}
			method::CLONE_SESSION => {
				let params: CloneSessionParams = params(request.params)?;
				let user = self.tickets.remove(&params.clone_ticket).ok_or_else(invalid_login)?;
				let session = self.open_session(&user, None);
				*key = Some(session.key.clone());
				Ok(json!(session))
			}
			other => Err(Error::from(Fault::new("MethodNotFound", format!("unknown method {other}")))),
		}
	}
}

/// One client connection to a [`Simulator`].
pub struct SimTransport {
	server: Simulator,
	session_key: Mutex<Option<String>>,
}

impl SimTransport {
	pub fn session_key(&self) -> Option<String> {
		self.session_key.lock().clone()
	}
}

impl Transport for SimTransport {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		let result = self.server.handle(&mut self.session_key.lock(), request);
		Box::pin(async move { result })
	}
}

fn params<T: DeserializeOwned>(value: Value) -> Result<T> {
	serde_json::from_value(value).map_err(|e| Error::from(Fault::new("InvalidRequest", e.to_string())))
}

fn invalid_login() -> Error {
	Error::from(Fault::new(
		fault_name::INVALID_LOGIN,
		"Cannot complete login due to an incorrect user name or password.",
	))
}

fn epoch_secs() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
