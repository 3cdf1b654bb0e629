//! Session descriptor and login parameter types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The server's view of an authenticated principal.
///
/// A session key is only meaningful to the transport that produced it; it is
/// not portable across connections (use a clone ticket for that).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
	/// Opaque session key.
	pub key: String,
	pub user_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub full_name: Option<String>,
	/// Unix epoch seconds.
	pub login_time: u64,
	/// Unix epoch seconds of the last call the server saw on this session.
	pub last_active_time: u64,
	#[serde(default)]
	pub locale: String,
	#[serde(default)]
	pub message_locale: String,
}

/// Login material.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
	Password { username: String, password: String },
	/// Bearer token issued by an external token service.
	Token { token: String },
}

impl Credentials {
	pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self::Password {
			username: username.into(),
			password: password.into(),
		}
	}

	pub fn token(token: impl Into<String>) -> Self {
		Self::Token { token: token.into() }
	}

	/// Username carried by these credentials, if any.
	pub fn username(&self) -> Option<&str> {
		match self {
			Self::Password { username, .. } => Some(username),
			Self::Token { .. } => None,
		}
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Password { username, .. } => f
				.debug_struct("Password")
				.field("username", username)
				.field("password", &"<redacted>")
				.finish(),
			Self::Token { .. } => f.debug_struct("Token").field("token", &"<redacted>").finish(),
		}
	}
}

/// Parameters for [`crate::method::LOGIN`].
///
/// Both user fields are omitted for anonymous or pre-authenticated transports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locale: Option<String>,
}

/// Parameters for [`crate::method::LOGIN_BY_TOKEN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginByTokenParams {
	pub token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locale: Option<String>,
}

/// Parameters for [`crate::method::SESSION_IS_ACTIVE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIsActiveParams {
	pub session_id: String,
	pub user_name: String,
}

/// Parameters for [`crate::method::CLONE_SESSION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneSessionParams {
	pub clone_ticket: String,
}
