//! Basic type definitions for the bulletin server
//!
//! - `ClientId`: UUID-based unique connection identifier
//! - `SessionState`: the registration state of one connection

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4. Two handles with the same id refer to the same
/// connection, which is how a sender is excluded from its own broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration state of a session
///
/// Threaded through the dispatcher by value; only a successful
/// `!register` moves a session from `Unregistered` to `Registered`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unregistered,
    Registered(String),
}

impl SessionState {
    /// The registered identity, if any
    pub fn identity(&self) -> Option<&str> {
        match self {
            SessionState::Unregistered => None,
            SessionState::Registered(name) => Some(name),
        }
    }
}
