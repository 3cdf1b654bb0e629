//! Session lifecycle subsystem.
//!
//! The [`SessionManager`] owns login/logout/lookup and the cached descriptor;
//! the wire-level descriptor type itself lives in `tether-protocol`.

/// Session manager and cache.
pub mod manager;

pub use manager::SessionManager;
pub use tether_protocol::{Credentials, UserSession};
