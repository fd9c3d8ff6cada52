//! Cart Owner Identity

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token identifying an anonymous browsing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Mint a fresh session token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The identity a cart line belongs to. A line is owned by exactly one of
/// these, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// A transient session with no durable account.
    Anonymous(SessionToken),

    /// An authenticated user.
    User(Uuid),
}

impl Owner {
    /// Whether this owner is an authenticated user.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Owner::User(_))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Anonymous(token) => write!(f, "anonymous:{token}"),
            Owner::User(uuid) => write!(f, "user:{uuid}"),
        }
    }
}
