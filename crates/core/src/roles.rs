//! Session identity and role checks.
//!
//! Sessions are issued by an external authentication layer; this module only
//! models what the write path needs to know about the caller.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::UserId;

/// Role name for support staff who log sessions.
pub const ROLE_SUPPORT: &str = "support";

/// Role name for the reviewer who receives the notification feed.
pub const ROLE_CURATOR: &str = "curator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Support,
    Curator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Support => ROLE_SUPPORT,
            Role::Curator => ROLE_CURATOR,
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn is_curator(&self) -> bool {
        self.role == Role::Curator
    }

    /// Fail with [`CoreError::Forbidden`] unless the session is a curator.
    pub fn require_curator(&self) -> Result<(), CoreError> {
        if self.is_curator() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "Only a curator can access notifications".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Curator).unwrap(), "\"curator\"");
        let role: Role = serde_json::from_str("\"support\"").unwrap();
        assert_eq!(role, Role::Support);
        assert_eq!(role.as_str(), ROLE_SUPPORT);
    }

    #[test]
    fn support_session_is_not_curator() {
        let session = Session::new("u1", "Aziza", Role::Support);
        assert!(!session.is_curator());
        assert_matches!(session.require_curator(), Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn curator_session_passes_check() {
        let session = Session::new("curator", "Kurator", Role::Curator);
        assert!(session.require_curator().is_ok());
    }
}
