//! Session state as seen by the rest of the application

use serde::{Deserialize, Serialize};

use super::User;

/// Default cache key for the session record
pub const SESSION_KEY: &str = "user_data";

/// Lifecycle of the current-user slot
///
/// Starts `Unknown` until the cache read or the first provider notification
/// resolves it; afterwards it moves between `Anonymous` and `Authenticated`
/// for the life of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unknown,
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SessionState::Unknown)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(self.user().cloned())
    }
}

/// Read-only view exposed by the context facade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub signed: bool,
}

impl SessionSnapshot {
    pub fn new(user: Option<User>) -> Self {
        let signed = user.is_some();
        Self { user, signed }
    }
}
