//! Retrying transport decorator.
//!
//! [`RetryingTransport`] re-issues a request when the inner transport fails
//! with an error its [`RetryPolicy`] classifies as retryable, up to the
//! policy's retry bound. The final error is returned unchanged.
//!
//! Only idempotent calls belong behind this decorator: a request whose reply
//! was lost in transit is sent again without de-duplication.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tether_protocol::Request;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportFuture};

/// Retry count used when none is configured.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Predicate deciding whether an error is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Backoff {
	/// Retry right away.
	#[default]
	Immediate,
	/// Same delay before every retry.
	Fixed(Duration),
	/// `initial * multiplier^n`, capped at `max`.
	Exponential {
		initial: Duration,
		multiplier: f64,
		max: Duration,
	},
}

impl Backoff {
	/// Delay before retry number `retry` (0-based).
	pub fn delay(&self, retry: u32) -> Duration {
		match *self {
			Backoff::Immediate => Duration::ZERO,
			Backoff::Fixed(delay) => delay,
			Backoff::Exponential { initial, multiplier, max } => {
				let scaled = initial.as_secs_f64() * multiplier.powi(retry.min(i32::MAX as u32) as i32);
				Duration::from_secs_f64(scaled.min(max.as_secs_f64()).max(0.0))
			}
		}
	}
}

/// Immutable retry configuration.
#[derive(Clone)]
pub struct RetryPolicy {
	max_retries: u32,
	retryable: RetryPredicate,
	backoff: Backoff,
}

impl RetryPolicy {
	/// Retries with a custom predicate.
	pub fn new<F>(max_retries: u32, retryable: F) -> Self
	where
		F: Fn(&Error) -> bool + Send + Sync + 'static,
	{
		Self {
			max_retries,
			retryable: Arc::new(retryable),
			backoff: Backoff::Immediate,
		}
	}

	/// Retries transient network errors (timeouts, resets, refused connects).
	pub fn temporary_network_error(max_retries: u32) -> Self {
		Self::new(max_retries, Error::is_temporary)
	}

	/// Never retries.
	pub fn none() -> Self {
		Self::temporary_network_error(0)
	}

	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.backoff = backoff;
		self
	}

	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	pub fn backoff(&self) -> Backoff {
		self.backoff
	}

	pub fn is_retryable(&self, err: &Error) -> bool {
		(self.retryable)(err)
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::temporary_network_error(DEFAULT_RETRY_COUNT)
	}
}

impl fmt::Debug for RetryPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RetryPolicy")
			.field("max_retries", &self.max_retries)
			.field("backoff", &self.backoff)
			.finish_non_exhaustive()
	}
}

/// Transport decorator that re-sends requests failing with retryable errors.
pub struct RetryingTransport {
	inner: Arc<dyn Transport>,
	policy: RetryPolicy,
}

impl RetryingTransport {
	pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
		Self { inner, policy }
	}

	async fn send_with_retry(&self, request: Request) -> Result<Value> {
		let mut retry = 0;
		loop {
			let err = match self.inner.send(request.clone()).await {
				Ok(value) => {
					if retry > 0 {
						debug!(target: "tether.retry", method = %request.method, retries = retry, "request recovered");
					}
					return Ok(value);
				}
				Err(err) => err,
			};

			if !self.policy.is_retryable(&err) {
				return Err(err);
			}
			if retry >= self.policy.max_retries {
				if retry > 0 {
					warn!(target: "tether.retry", method = %request.method, retries = retry, error = %err, "giving up after retries");
				}
				return Err(err);
			}

			let delay = self.policy.backoff.delay(retry);
			retry += 1;
			debug!(
				target: "tether.retry",
				method = %request.method,
				retry,
				max_retries = self.policy.max_retries,
				?delay,
				error = %err,
				"retrying after transient failure"
			);
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
		}
	}
}

impl Transport for RetryingTransport {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(self.send_with_retry(request))
	}
}
