//! Client-local session identity
//!
//! A session identifier is created once when the client starts and stays
//! fixed for the lifetime of that client. The chat service routes the
//! WebSocket by it (`/ws/{session_id}`) and echoes it in every outbound
//! `message` event. It is never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed prefix of every generated session identifier.
pub const SESSION_PREFIX: &str = "session_";

/// Opaque, immutable session identifier.
///
/// # Examples
///
/// ```
/// use opschat::session::create_session_id;
///
/// let id = create_session_id();
/// assert!(id.as_str().starts_with("session_"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier, e.g. one supplied on the command line.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Create the session identifier for this client instance.
///
/// The identifier is the fixed [`SESSION_PREFIX`] followed by the current
/// Unix time in milliseconds. Uniqueness is best-effort: two clients started
/// in the same millisecond get the same identifier. This cannot fail.
pub fn create_session_id() -> SessionId {
    let millis = chrono::Utc::now().timestamp_millis();
    SessionId(format!("{SESSION_PREFIX}{millis}"))
}
