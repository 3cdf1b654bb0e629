//! Session method calls.
//!
//! Thin typed wrappers that issue one session-catalogue call through any
//! [`Transport`]. They hold no state; caching and invalidation live in
//! [`SessionManager`](crate::SessionManager).

use serde_json::Value;
use tether_protocol::{
	CloneSessionParams, Credentials, LoginByTokenParams, LoginParams, SessionIsActiveParams, UserSession, method,
};
use tether_runtime::{ProbeHandler, Result, Transport, call, call_no_params, probe_handler};

/// Logs in with `credentials`, or without user fields when `None`.
///
/// [`Credentials::Token`] is routed to [`login_by_token`].
pub async fn login<T>(transport: &T, credentials: Option<&Credentials>, locale: Option<&str>) -> Result<UserSession>
where
	T: Transport + ?Sized,
{
	let params = match credentials {
		Some(Credentials::Token { token }) => return login_by_token(transport, token, locale).await,
		Some(Credentials::Password { username, password }) => LoginParams {
			user_name: Some(username.clone()),
			password: Some(password.clone()),
			locale: locale.map(str::to_string),
		},
		None => LoginParams {
			locale: locale.map(str::to_string),
			..LoginParams::default()
		},
	};
	call(transport, method::LOGIN, params).await
}

/// Logs in by handing a bearer token to the server.
pub async fn login_by_token<T>(transport: &T, token: &str, locale: Option<&str>) -> Result<UserSession>
where
	T: Transport + ?Sized,
{
	let params = LoginByTokenParams {
		token: token.to_string(),
		locale: locale.map(str::to_string),
	};
	call(transport, method::LOGIN_BY_TOKEN, params).await
}

pub async fn logout<T: Transport + ?Sized>(transport: &T) -> Result<()> {
	let _: Value = call_no_params(transport, method::LOGOUT).await?;
	Ok(())
}

/// Reads the caller's current session; `None` when the server reports none.
pub async fn current_session<T: Transport + ?Sized>(transport: &T) -> Result<Option<UserSession>> {
	call_no_params(transport, method::CURRENT_SESSION).await
}

/// Asks the server whether `session_id` is still active for `user_name`.
pub async fn session_is_active<T>(transport: &T, session_id: &str, user_name: &str) -> Result<bool>
where
	T: Transport + ?Sized,
{
	let params = SessionIsActiveParams {
		session_id: session_id.to_string(),
		user_name: user_name.to_string(),
	};
	call(transport, method::SESSION_IS_ACTIVE, params).await
}

/// Server clock, Unix epoch seconds.
pub async fn current_time<T: Transport + ?Sized>(transport: &T) -> Result<u64> {
	call_no_params(transport, method::CURRENT_TIME).await
}

/// Issues a one-time ticket that another connection can redeem with [`clone_session`].
pub async fn acquire_clone_ticket<T: Transport + ?Sized>(transport: &T) -> Result<String> {
	call_no_params(transport, method::ACQUIRE_CLONE_TICKET).await
}

pub async fn clone_session<T: Transport + ?Sized>(transport: &T, ticket: &str) -> Result<UserSession> {
	let params = CloneSessionParams {
		clone_ticket: ticket.to_string(),
	};
	call(transport, method::CLONE_SESSION, params).await
}

/// Default keep-alive probe: a [`current_time`] call.
pub fn keep_alive_probe() -> ProbeHandler {
	probe_handler(|transport: std::sync::Arc<dyn Transport>| async move { current_time(&*transport).await.map(|_| ()) })
}
