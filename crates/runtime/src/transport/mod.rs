//! The transport capability and its leaf implementation.
//!
//! A [`Transport`] sends one [`Request`] and yields the reply's result value or
//! an [`Error`](crate::Error). Decorators ([`RetryingTransport`], [`KeepAlive`])
//! implement the same trait around an `Arc<dyn Transport>`, so callers never
//! see how many layers sit beneath them.
//!
//! [`RetryingTransport`]: crate::RetryingTransport
//! [`KeepAlive`]: crate::KeepAlive

mod http;
#[cfg(test)]
pub(crate) mod scripted;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use http::{HttpTransport, SESSION_KEY_HEADER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_protocol::Request;

use crate::error::Result;

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// Capability to send a request and await its result.
pub trait Transport: Send + Sync {
	/// Sends `request` and resolves to the reply's result value.
	fn send(&self, request: Request) -> TransportFuture<'_>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
	fn send(&self, request: Request) -> TransportFuture<'_> {
		(**self).send(request)
	}
}

/// Sends a typed call through `transport` and decodes the result.
pub async fn call<T, P, R>(transport: &T, method: &str, params: P) -> Result<R>
where
	T: Transport + ?Sized,
	P: Serialize,
	R: DeserializeOwned,
{
	let params = serde_json::to_value(params)?;
	let result = transport.send(Request::new(method, params)).await?;
	serde_json::from_value(result).map_err(Into::into)
}

/// Sends a call with no parameters.
pub async fn call_no_params<T, R>(transport: &T, method: &str) -> Result<R>
where
	T: Transport + ?Sized,
	R: DeserializeOwned,
{
	call(transport, method, Value::Null).await
}
