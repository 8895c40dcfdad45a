//! Session actions.
//!
//! Every change to [`AuthState`](crate::state::AuthState) is described by a
//! [`SessionAction`] and folded by the
//! [`SessionReducer`](crate::reducer::SessionReducer).

use crate::state::Session;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of auth-state-change event delivered by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthChangeKind {
    /// First event after subscribing, carrying whatever session exists.
    InitialSession,
    /// A user signed in.
    SignedIn,
    /// The user signed out.
    SignedOut,
    /// Tokens were rotated.
    TokenRefreshed,
    /// Identity attributes changed.
    UserUpdated,
    /// The user followed a password-recovery link.
    PasswordRecovery,
    /// The account was deleted remotely.
    UserDeleted,
}

impl AuthChangeKind {
    /// Returns `true` for kinds that end the session on purpose.
    #[must_use]
    pub const fn is_sign_out(self) -> bool {
        matches!(self, Self::SignedOut | Self::UserDeleted)
    }

    /// Get the kind name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialSession => "initial_session",
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
            Self::UserUpdated => "user_updated",
            Self::PasswordRecovery => "password_recovery",
            Self::UserDeleted => "user_deleted",
        }
    }
}

impl fmt::Display for AuthChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An auth-state-change event from the identity provider's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthChange {
    /// What happened.
    pub kind: AuthChangeKind,

    /// Session after the change, if any.
    pub session: Option<Session>,
}

impl AuthChange {
    /// A `SignedIn` event carrying `session`.
    #[must_use]
    pub const fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthChangeKind::SignedIn,
            session: Some(session),
        }
    }

    /// A `SignedOut` event with no session.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            kind: AuthChangeKind::SignedOut,
            session: None,
        }
    }
}

/// All inputs to the session reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Bootstrap snapshot fetch resolved.
    SnapshotLoaded {
        /// Session returned by the provider, if any.
        session: Option<Session>,
    },

    /// Bootstrap snapshot fetch failed.
    SnapshotFailed {
        /// Reason for failure.
        reason: String,
    },

    /// An event arrived on the provider's change stream.
    RemoteChange(AuthChange),

    /// The remote sign-out call failed; the local session ends anyway.
    ForcedSignOut {
        /// Reason the remote call failed.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_out_kinds() {
        assert!(AuthChangeKind::SignedOut.is_sign_out());
        assert!(AuthChangeKind::UserDeleted.is_sign_out());
        assert!(!AuthChangeKind::TokenRefreshed.is_sign_out());
        assert!(!AuthChangeKind::InitialSession.is_sign_out());
    }

    #[test]
    fn test_kind_str() {
        assert_eq!(AuthChangeKind::SignedIn.as_str(), "signed_in");
        assert_eq!(AuthChangeKind::SignedOut.to_string(), "signed_out");
    }

    #[test]
    fn test_signed_out_carries_no_session() {
        let change = AuthChange::signed_out();
        assert_eq!(change.kind, AuthChangeKind::SignedOut);
        assert!(change.session.is_none());
    }
}
