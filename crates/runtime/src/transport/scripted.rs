//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tether_protocol::Request;

use super::{Transport, TransportFuture};
use crate::error::{Error, Result};

/// Replies with queued results in order, then `null` once the script runs dry.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
	script: Mutex<VecDeque<Result<Value>>>,
	sent: Mutex<Vec<String>>,
	calls: AtomicUsize,
}

impl ScriptedTransport {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn push_ok(&self, value: Value) {
		self.script.lock().push_back(Ok(value));
	}

	pub(crate) fn push_err(&self, err: Error) {
		self.script.lock().push_back(Err(err));
	}

	pub(crate) fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub(crate) fn sent_methods(&self) -> Vec<String> {
		self.sent.lock().clone()
	}
}

impl Transport for ScriptedTransport {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.sent.lock().push(request.method);
		let next = self.script.lock().pop_front().unwrap_or(Ok(Value::Null));
		Box::pin(async move { next })
	}
}
