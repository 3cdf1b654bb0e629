use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fault names with meaning to the session layer.
pub mod fault_name {
	/// The call requires a session and the caller has none (or it expired).
	pub const NOT_AUTHENTICATED: &str = "NotAuthenticated";
	/// Login rejected the supplied credentials.
	pub const INVALID_LOGIN: &str = "InvalidLogin";
	/// The server does not implement the method.
	pub const NOT_SUPPORTED: &str = "NotSupported";
}

/// A single call to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Method name, e.g. [`crate::method::LOGIN`].
	pub method: String,
	/// Method parameters; `null` when the method takes none.
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub params: Value,
}

impl Request {
	pub fn new(method: impl Into<String>, params: Value) -> Self {
		Self {
			method: method.into(),
			params,
		}
	}

	/// Creates a request for a method that takes no parameters.
	pub fn without_params(method: impl Into<String>) -> Self {
		Self::new(method, Value::Null)
	}
}

/// Server-side failure attached to a [`Reply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
	/// Fault type name (see [`fault_name`]).
	pub name: String,
	/// Human-readable detail.
	#[serde(default)]
	pub message: String,
}

impl Fault {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
		}
	}

	pub fn not_authenticated(message: impl Into<String>) -> Self {
		Self::new(fault_name::NOT_AUTHENTICATED, message)
	}
}

/// Reply envelope: exactly one of `result` or `fault` is meaningful.
///
/// A reply with neither set is a successful call with no return value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reply {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fault: Option<Fault>,
}

impl Reply {
	pub fn ok(result: Value) -> Self {
		Self {
			result: Some(result),
			fault: None,
		}
	}

	pub fn fault(fault: Fault) -> Self {
		Self {
			result: None,
			fault: Some(fault),
		}
	}

	/// Splits the envelope, preferring the fault when both are present.
	pub fn into_result(self) -> Result<Value, Fault> {
		match self.fault {
			Some(fault) => Err(fault),
			None => Ok(self.result.unwrap_or(Value::Null)),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_omits_null_params() {
		let encoded = serde_json::to_value(Request::without_params("SessionManager.Logout")).unwrap();
		assert_eq!(encoded, json!({"method": "SessionManager.Logout"}));
	}

	#[test]
	fn reply_fault_wins_over_result() {
		let reply = Reply {
			result: Some(json!(1)),
			fault: Some(Fault::not_authenticated("expired")),
		};
		let fault = reply.into_result().unwrap_err();
		assert_eq!(fault.name, fault_name::NOT_AUTHENTICATED);
	}

	#[test]
	fn empty_reply_is_null_result() {
		let reply: Reply = serde_json::from_str("{}").unwrap();
		assert_eq!(reply.into_result().unwrap(), Value::Null);
	}

	#[test]
	fn fault_message_defaults_to_empty() {
		let reply: Reply = serde_json::from_str(r#"{"fault": {"name": "NotSupported"}}"#).unwrap();
		let fault = reply.into_result().unwrap_err();
		assert_eq!(fault.name, "NotSupported");
		assert!(fault.message.is_empty());
	}
}
