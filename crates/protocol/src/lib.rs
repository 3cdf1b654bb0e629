//! Wire types shared by the tether transport and session layers.
//!
//! Everything in this crate is plain data: a [`Request`] names a server method
//! and carries JSON parameters, a [`Reply`] carries either a result or a
//! [`Fault`], and [`UserSession`] is the server's view of an authenticated
//! principal. The runtime and client crates give these values behaviour.
//!
//! # Main Types
//!
//! - [`Request`] / [`Reply`] / [`Fault`] - call envelope
//! - [`UserSession`] - session descriptor returned by login and session queries
//! - [`Credentials`] - username/password or bearer-token login material
//! - [`method`] - names of the session methods the client issues

pub mod method;
mod request;
mod session;

pub use request::{Fault, Reply, Request, fault_name};
pub use session::{
	CloneSessionParams, Credentials, LoginByTokenParams, LoginParams, SessionIsActiveParams,
	UserSession,
};
