//! Method names for the session catalogue.

pub const LOGIN: &str = "SessionManager.Login";
pub const LOGIN_BY_TOKEN: &str = "SessionManager.LoginByToken";
pub const LOGOUT: &str = "SessionManager.Logout";
/// Property read of the caller's current session; replies `null` when absent.
pub const CURRENT_SESSION: &str = "SessionManager.CurrentSession";
pub const SESSION_IS_ACTIVE: &str = "SessionManager.SessionIsActive";
pub const ACQUIRE_CLONE_TICKET: &str = "SessionManager.AcquireCloneTicket";
pub const CLONE_SESSION: &str = "SessionManager.CloneSession";
/// Cheap authenticated call used as the default keep-alive probe.
pub const CURRENT_TIME: &str = "ServiceInstance.CurrentTime";
