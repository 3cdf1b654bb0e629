//! Tether runtime - transport capability and its decorators
//!
//! This crate provides the resilient-transport layer underneath a tether
//! session:
//!
//! - **Transport**: the single `send(request) -> result` capability, plus a
//!   JSON-over-HTTP leaf implementation
//! - **Retry**: a decorator that re-sends requests failing with transient
//!   network errors, bounded by a [`RetryPolicy`]
//! - **Keep-alive**: a decorator that records request activity and probes the
//!   session from a background task once it has been idle
//! - **Errors**: one error type with a closed [`ErrorKind`] classification
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ tether       │  SessionManager / Client
//! └──────┬───────┘
//!        │ Arc<dyn Transport>
//! ┌──────▼───────┐
//! │  KeepAlive   │  activity tracking, idle probes
//! └──────┬───────┘
//! ┌──────▼───────┐
//! │  Retrying    │  transient-failure masking
//! └──────┬───────┘
//! ┌──────▼───────┐
//! │  Leaf        │  HttpTransport (or any Transport)
//! └──────────────┘
//! ```

pub mod error;
pub mod keepalive;
pub mod retry;
pub mod transport;

pub use error::{Error, ErrorKind, Result};
pub use keepalive::{
	DEFAULT_IDLE_INTERVAL, DEFAULT_PROBE_TIMEOUT, KeepAlive, KeepAlivePhase, KeepAliveStatus, ProbeFuture,
	ProbeHandler, probe_handler,
};
pub use retry::{Backoff, DEFAULT_RETRY_COUNT, RetryPolicy, RetryPredicate, RetryingTransport};
pub use transport::{HttpTransport, SESSION_KEY_HEADER, Transport, TransportFuture, call, call_no_params};
