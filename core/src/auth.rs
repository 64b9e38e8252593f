use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authentication status as seen by the sync machinery.
///
/// Guest sessions hold a usable identity for local reads and writes but are
/// excluded from cloud sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No session information available yet.
    Unknown,
    SignedIn { user_id: String },
    Guest { user_id: String },
    SignedOut,
}

impl AuthState {
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::SignedIn { user_id } | Self::Guest { user_id } => Some(user_id),
            Self::Unknown | Self::SignedOut => None,
        }
    }

    /// Only a full signed-in session may touch the remote store.
    #[must_use]
    pub fn allows_sync(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Unknown => "unknown".to_string(),
            Self::SignedIn { user_id } => format!("signed in as {user_id}"),
            Self::Guest { user_id } => format!("guest session {user_id} (sync disabled)"),
            Self::SignedOut => "signed out".to_string(),
        }
    }
}

/// Persisted session record. The identity provider itself is external; this
/// is only what the device remembers between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(default)]
    pub guest: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        if self.guest {
            AuthState::Guest {
                user_id: self.user_id.clone(),
            }
        } else {
            AuthState::SignedIn {
                user_id: self.user_id.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_auth_state_user_id() {
        let signed_in = AuthState::SignedIn {
            user_id: "u1".to_string(),
        };
        let guest = AuthState::Guest {
            user_id: "g1".to_string(),
        };
        assert_eq!(signed_in.user_id(), Some("u1"));
        assert_eq!(guest.user_id(), Some("g1"));
        assert_eq!(AuthState::SignedOut.user_id(), None);
        assert_eq!(AuthState::Unknown.user_id(), None);
    }

    #[test]
    fn test_only_signed_in_allows_sync() {
        assert!(
            AuthState::SignedIn {
                user_id: "u1".to_string()
            }
            .allows_sync()
        );
        assert!(
            !AuthState::Guest {
                user_id: "g1".to_string()
            }
            .allows_sync()
        );
        assert!(!AuthState::SignedOut.allows_sync());
        assert!(!AuthState::Unknown.allows_sync());
    }

    #[test]
    fn test_session_to_auth_state() {
        let session = Session {
            user_id: "u1".to_string(),
            email: Some("jo@example.com".to_string()),
            guest: false,
            signed_in_at: Utc.timestamp_millis_opt(0).unwrap(),
        };
        assert!(session.auth_state().allows_sync());

        let guest = Session {
            guest: true,
            ..session
        };
        assert!(!guest.auth_state().allows_sync());
        assert_eq!(guest.auth_state().user_id(), Some("u1"));
    }
}
