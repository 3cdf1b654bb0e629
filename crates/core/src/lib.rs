//! Tether - authenticated RPC sessions that stay alive.
//!
//! A [`Client`] wraps any [`Transport`] in two decorators and puts a
//! [`SessionManager`] on top:
//!
//! - transient network failures are retried a bounded number of times
//! - after a configurable idle interval a background probe keeps the server
//!   session from expiring
//! - the authenticated session is cached and invalidated when the server
//!   reports it gone
//!
//! ```ignore
//! use std::sync::Arc;
//! use tether::{Client, Credentials, HttpTransport};
//!
//! let leaf = Arc::new(HttpTransport::new("https://rpc.example.com/session")?);
//! let client = Client::builder(leaf).retry_count(3).build()?;
//! client.login(Some(&Credentials::password("admin", "secret"))).await?;
//! let active = client.is_session_active().await?;
//! client.logout().await?;
//! ```
//!
//! The [`sim`] module provides an in-process server for tests and demos.

pub mod client;
pub mod config;
pub mod methods;
pub mod session;
pub mod sim;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use session::SessionManager;
pub use sim::{SimTransport, Simulator};
pub use tether_protocol::{Credentials, Fault, Request, UserSession, method};
pub use tether_runtime::{
	Backoff, Error, ErrorKind, HttpTransport, KeepAlive, KeepAlivePhase, KeepAliveStatus, ProbeHandler, Result,
	RetryPolicy, RetryingTransport, Transport, TransportFuture, probe_handler,
};
