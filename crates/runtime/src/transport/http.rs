//! JSON-over-HTTP leaf transport.
//!
//! Each request is POSTed to the endpoint as `{"method", "params"}` and the
//! body of the response is decoded as a [`Reply`]. The server hands out a
//! session key in the [`SESSION_KEY_HEADER`] response header; the transport
//! keeps it and replays it on every later request, so a session belongs to
//! exactly one transport instance.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::Value;
use tether_protocol::{Reply, Request};
use tracing::debug;
use url::Url;

use super::{Transport, TransportFuture};
use crate::error::{Error, Result};

/// Header carrying the session key in both directions.
pub const SESSION_KEY_HEADER: &str = "x-session-key";

/// Leaf transport speaking the JSON envelope over HTTP(S).
pub struct HttpTransport {
	client: reqwest::Client,
	endpoint: Url,
	timeout: Option<Duration>,
	session_key: Mutex<Option<String>>,
}

impl HttpTransport {
	/// Creates a transport for `endpoint` without a per-request timeout.
	pub fn new(endpoint: &str) -> Result<Self> {
		Self::with_timeout(endpoint, None)
	}

	/// Creates a transport whose individual HTTP exchanges time out after `timeout`.
	pub fn with_timeout(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
		let endpoint = Url::parse(endpoint).map_err(|e| Error::InvalidArgument(format!("endpoint '{endpoint}': {e}")))?;
		if !matches!(endpoint.scheme(), "http" | "https") {
			return Err(Error::InvalidArgument(format!("unsupported endpoint scheme '{}'", endpoint.scheme())));
		}

		let mut builder = reqwest::Client::builder();
		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}
		let client = builder.build().map_err(|e| Error::InvalidArgument(format!("http client: {e}")))?;

		Ok(Self {
			client,
			endpoint,
			timeout,
			session_key: Mutex::new(None),
		})
	}

	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Session key most recently issued by the server, if any.
	pub fn session_key(&self) -> Option<String> {
		self.session_key.lock().clone()
	}

	/// Replaces the stored session key (e.g. to adopt a key issued elsewhere).
	pub fn set_session_key(&self, key: Option<String>) {
		*self.session_key.lock() = key;
	}

	async fn round_trip(&self, request: Request) -> Result<Value> {
		debug!(target: "tether.http", method = %request.method, endpoint = %self.endpoint, "sending request");

		let session_key = self.session_key();
		let mut builder = self.client.post(self.endpoint.clone()).json(&request);
		if let Some(key) = session_key {
			builder = builder.header(SESSION_KEY_HEADER, key);
		}

		let response = builder.send().await.map_err(|e| self.classify(e))?;

		let issued = response
			.headers()
			.get(SESSION_KEY_HEADER)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string);
		if let Some(key) = issued {
			self.set_session_key(Some(key));
		}

		let status = response.status();
		if matches!(
			status,
			StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
		) {
			return Err(Error::transient(format!("server returned {status}")));
		}

		let body = response.bytes().await.map_err(|e| self.classify(e))?;
		let reply: Reply = serde_json::from_slice(&body)
			.map_err(|e| Error::ProtocolError(format!("malformed reply (HTTP {status}): {e}")))?;

		reply.into_result().map_err(Error::from)
	}

	fn classify(&self, err: reqwest::Error) -> Error {
		if err.is_timeout() {
			return Error::Timeout(self.timeout.unwrap_or_default());
		}
		Error::Network {
			temporary: err.is_connect() || err.is_request(),
			message: err.to_string(),
		}
	}
}

impl Transport for HttpTransport {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(self.round_trip(request))
	}
}

impl std::fmt::Debug for HttpTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpTransport")
			.field("endpoint", &self.endpoint.as_str())
			.field("timeout", &self.timeout)
			.field("has_session_key", &self.session_key.lock().is_some())
			.finish()
	}
}
