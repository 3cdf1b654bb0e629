//! Keep-alive supervisor.
//!
//! [`KeepAlive`] wraps a transport and keeps an idle server session from
//! expiring. Every successful request that passes through it records activity.
//! Once [`start`](KeepAlive::start)ed, a background task waits for the idle
//! interval to elapse without activity and then invokes the probe handler with
//! the wrapped transport.
//!
//! ```text
//! Idle ──start──▶ Armed ──idle──▶ Probing ──Ok──▶ Armed
//!                   │                │
//!                   └──shutdown──────┴──Err / timeout / shutdown──▶ Stopped
//! ```
//!
//! `Stopped` is terminal. The supervisor never retries a failed probe; layer a
//! [`RetryingTransport`](crate::RetryingTransport) underneath if the probe path
//! should ride out network blips.

#[cfg(test)]
mod tests;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tether_protocol::Request;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportFuture};

/// Idle interval used when none is configured.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Probe deadline used when none is configured.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Boxed future returned by a [`ProbeHandler`].
pub type ProbeFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Liveness probe: receives the wrapped transport, `Err` stops the supervisor.
pub type ProbeHandler = Arc<dyn Fn(Arc<dyn Transport>) -> ProbeFuture + Send + Sync>;

/// Boxes an async closure into a [`ProbeHandler`].
pub fn probe_handler<F, Fut>(f: F) -> ProbeHandler
where
	F: Fn(Arc<dyn Transport>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<()>> + Send + 'static,
{
	Arc::new(move |transport| Box::pin(f(transport)))
}

/// Supervisor lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAlivePhase {
	Idle,
	Armed,
	Probing,
	Stopped,
}

/// Point-in-time view of a supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveStatus {
	pub phase: KeepAlivePhase,
	/// Idle time after which a probe fires.
	pub idle_interval: Duration,
	/// Probes that completed successfully.
	pub probes: u64,
	/// Successful requests recorded as session activity.
	pub activity: u64,
	/// Time since the last recorded activity or probe.
	pub idle_for: Duration,
	/// Error that stopped the supervisor, if a probe failed.
	pub last_error: Option<String>,
}

struct State {
	phase: KeepAlivePhase,
	last_activity: Instant,
	probes: u64,
	activity: u64,
	last_error: Option<String>,
	cancel: Option<CancellationToken>,
}

impl State {
	fn stop(&mut self) {
		self.phase = KeepAlivePhase::Stopped;
		if let Some(cancel) = self.cancel.take() {
			cancel.cancel();
		}
	}
}

/// Transport decorator that probes the session when traffic goes quiet.
pub struct KeepAlive {
	inner: Arc<dyn Transport>,
	idle_interval: Duration,
	probe_timeout: Duration,
	handler: ProbeHandler,
	state: Arc<Mutex<State>>,
}

impl KeepAlive {
	/// Wraps `inner`; no background task runs until [`start`](Self::start).
	pub fn new(inner: Arc<dyn Transport>, idle_interval: Duration, handler: ProbeHandler) -> Self {
		Self {
			inner,
			idle_interval,
			probe_timeout: DEFAULT_PROBE_TIMEOUT,
			handler,
			state: Arc::new(Mutex::new(State {
				phase: KeepAlivePhase::Idle,
				last_activity: Instant::now(),
				probes: 0,
				activity: 0,
				last_error: None,
				cancel: None,
			})),
		}
	}

	/// Bounds each probe; a probe running longer counts as failed.
	pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
		self.probe_timeout = timeout;
		self
	}

	pub fn idle_interval(&self) -> Duration {
		self.idle_interval
	}

	/// Launches the background task. Returns `false` if already started or stopped.
	///
	/// Must be called from within a tokio runtime.
	pub fn start(&self) -> bool {
		let cancel = {
			let mut state = self.state.lock();
			if state.phase != KeepAlivePhase::Idle {
				return false;
			}
			let cancel = CancellationToken::new();
			state.phase = KeepAlivePhase::Armed;
			state.last_activity = Instant::now();
			state.cancel = Some(cancel.clone());
			cancel
		};

		info!(target: "tether.keepalive", interval = ?self.idle_interval, "keep-alive armed");
		tokio::spawn(
			run(
				Arc::clone(&self.inner),
				self.idle_interval,
				self.probe_timeout,
				Arc::clone(&self.handler),
				Arc::clone(&self.state),
				cancel,
			)
			.instrument(info_span!("keep_alive")),
		);
		true
	}

	/// Stops the supervisor for good and cancels the background task.
	pub fn shutdown(&self) {
		let mut state = self.state.lock();
		if state.phase != KeepAlivePhase::Stopped {
			state.stop();
			info!(target: "tether.keepalive", "keep-alive shut down");
		}
	}

	pub fn phase(&self) -> KeepAlivePhase {
		self.state.lock().phase
	}

	pub fn is_running(&self) -> bool {
		matches!(self.phase(), KeepAlivePhase::Armed | KeepAlivePhase::Probing)
	}

	pub fn status(&self) -> KeepAliveStatus {
		let state = self.state.lock();
		KeepAliveStatus {
			phase: state.phase,
			idle_interval: self.idle_interval,
			probes: state.probes,
			activity: state.activity,
			idle_for: state.last_activity.elapsed(),
			last_error: state.last_error.clone(),
		}
	}

	fn record_activity(&self) {
		let mut state = self.state.lock();
		state.last_activity = Instant::now();
		state.activity += 1;
	}

	async fn send_and_record(&self, request: Request) -> Result<Value> {
		let result = self.inner.send(request).await;
		if result.is_ok() {
			self.record_activity();
		}
		result
	}
}

impl Transport for KeepAlive {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(self.send_and_record(request))
	}
}

impl Drop for KeepAlive {
	fn drop(&mut self) {
		self.state.lock().stop();
	}
}

/// Timer loop: sleep until the session has been idle for `idle_interval`, probe, repeat.
async fn run(
	transport: Arc<dyn Transport>,
	idle_interval: Duration,
	probe_timeout: Duration,
	handler: ProbeHandler,
	state: Arc<Mutex<State>>,
	cancel: CancellationToken,
) {
	loop {
		let deadline = state.lock().last_activity + idle_interval;
		tokio::select! {
			biased;
			() = cancel.cancelled() => {
				debug!(target: "tether.keepalive", "timer cancelled");
				return;
			}
			() = tokio::time::sleep_until(deadline) => {}
		}

		{
			let mut guard = state.lock();
			if guard.phase == KeepAlivePhase::Stopped {
				return;
			}
			if guard.last_activity.elapsed() < idle_interval {
				continue;
			}
			guard.phase = KeepAlivePhase::Probing;
		}

		debug!(target: "tether.keepalive", "session idle; probing");
		let outcome = tokio::select! {
			biased;
			() = cancel.cancelled() => return,
			outcome = tokio::time::timeout(probe_timeout, handler(Arc::clone(&transport))) => outcome,
		};

		let mut guard = state.lock();
		if guard.phase == KeepAlivePhase::Stopped {
			return;
		}
		let err = match outcome {
			Ok(Ok(())) => {
				guard.phase = KeepAlivePhase::Armed;
				guard.last_activity = Instant::now();
				guard.probes += 1;
				continue;
			}
			Ok(Err(err)) => err,
			Err(_) => Error::Timeout(probe_timeout),
		};

		let err = Error::ProbeFailed(err.to_string());
		warn!(target: "tether.keepalive", error = %err, "stopping keep-alive");
		guard.last_error = Some(err.to_string());
		guard.stop();
		break;
	}
}
