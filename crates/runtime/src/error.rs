//! Error types for the tether runtime.

use std::time::Duration;

use tether_protocol::{Fault, fault_name};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by the retry policy and the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Connection reset, timeout, temporary resolution failure.
	TransientNetwork,
	/// The server reports the session is invalid or absent.
	NotAuthenticated,
	/// The keep-alive probe handler failed.
	ProbeFailure,
	/// Everything else: application faults, malformed replies, bad input.
	Protocol,
}

/// Errors that can occur while talking to the server.
#[derive(Debug, Error)]
pub enum Error {
	/// Network-level failure below the RPC layer.
	#[error("Network error: {message}")]
	Network {
		message: String,
		/// Whether the condition is expected to clear on its own.
		temporary: bool,
	},

	/// A request, or a probe, ran past its deadline.
	#[error("Timeout after {0:?}")]
	Timeout(Duration),

	/// Server reports the caller has no valid session.
	#[error("Not authenticated: {0}")]
	NotAuthenticated(String),

	/// Server-side application fault other than [`Error::NotAuthenticated`].
	#[error("{name}: {message}")]
	Fault { name: String, message: String },

	/// Keep-alive probe handler reported failure.
	#[error("Keep-alive probe failed: {0}")]
	ProbeFailed(String),

	/// Reply could not be understood.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Invalid endpoint or configuration.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// The operation was cancelled before it completed.
	#[error("Cancelled")]
	Cancelled,

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Temporary network error, eligible for retry.
	pub fn transient(message: impl Into<String>) -> Self {
		Error::Network {
			message: message.into(),
			temporary: true,
		}
	}

	/// Returns the classification of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Network { temporary: true, .. } | Error::Timeout(_) => ErrorKind::TransientNetwork,
			Error::NotAuthenticated(_) => ErrorKind::NotAuthenticated,
			Error::ProbeFailed(_) => ErrorKind::ProbeFailure,
			_ => ErrorKind::Protocol,
		}
	}

	/// Returns true for transient network conditions.
	pub fn is_temporary(&self) -> bool {
		self.kind() == ErrorKind::TransientNetwork
	}

	/// Returns true if the server rejected the call for lack of a session.
	pub fn is_not_authenticated(&self) -> bool {
		self.kind() == ErrorKind::NotAuthenticated
	}

	/// Returns the fault name if this error came from a server fault.
	pub fn fault_name(&self) -> Option<&str> {
		match self {
			Error::NotAuthenticated(_) => Some(fault_name::NOT_AUTHENTICATED),
			Error::Fault { name, .. } => Some(name),
			_ => None,
		}
	}
}

impl From<Fault> for Error {
	fn from(fault: Fault) -> Self {
		if fault.name == fault_name::NOT_AUTHENTICATED {
			Error::NotAuthenticated(fault.message)
		} else {
			Error::Fault {
				name: fault.name,
				message: fault.message,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_by_kind() {
		assert_eq!(Error::transient("reset").kind(), ErrorKind::TransientNetwork);
		assert_eq!(Error::Timeout(Duration::from_secs(1)).kind(), ErrorKind::TransientNetwork);
		assert_eq!(
			Error::Network {
				message: "refused".into(),
				temporary: false,
			}
			.kind(),
			ErrorKind::Protocol
		);
		assert_eq!(Error::ProbeFailed("dead".into()).kind(), ErrorKind::ProbeFailure);
		assert_eq!(Error::Cancelled.kind(), ErrorKind::Protocol);
	}

	#[test]
	fn not_authenticated_fault_maps_to_dedicated_variant() {
		let err = Error::from(Fault::not_authenticated("session expired"));
		assert!(err.is_not_authenticated());
		assert_eq!(err.fault_name(), Some("NotAuthenticated"));
		assert_eq!(err.to_string(), "Not authenticated: session expired");
	}

	#[test]
	fn other_faults_keep_name_and_message() {
		let err = Error::from(Fault::new("NoPermission", "read denied"));
		assert_eq!(err.kind(), ErrorKind::Protocol);
		assert_eq!(err.to_string(), "NoPermission: read denied");
	}
}
