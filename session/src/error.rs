//! Error types for session operations.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors returned by an [`IdentityService`](crate::providers::IdentityService).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The provider could not be reached or answered garbage.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider understood the request and refused it.
    #[error("Rejected by identity provider: {reason}")]
    Rejected {
        /// Provider's explanation
        reason: String,
    },
}

/// Caller-facing error taxonomy.
///
/// A failed bootstrap fetch never shows up here: it degrades to the fallback
/// identity instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    // ═══════════════════════════════════════════════════════════
    // Provider Reachability
    // ═══════════════════════════════════════════════════════════

    /// The identity provider could not be reached.
    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    // ═══════════════════════════════════════════════════════════
    // Operation Failures
    // ═══════════════════════════════════════════════════════════

    /// Sign-up or sign-in was rejected.
    #[error("Credentials rejected: {reason}")]
    Credential {
        /// Reason for rejection
        reason: String,
    },

    /// The remote sign-out call failed. Local state was cleared anyway.
    #[error("Sign-out failed: {reason}")]
    SignOut {
        /// Reason for failure
        reason: String,
    },

    /// The password-recovery request failed.
    #[error("Password recovery request failed: {reason}")]
    RecoveryRequest {
        /// Reason for failure
        reason: String,
    },
}

impl SessionError {
    /// Map a sign-up or sign-in failure.
    #[must_use]
    pub fn from_credential_failure(error: ServiceError) -> Self {
        match error {
            ServiceError::Transport(message) => Self::Transport(message),
            ServiceError::Rejected { reason } => Self::Credential { reason },
        }
    }

    /// Returns `true` if the error should be shown to the user as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// # use composable_session::SessionError;
    /// let error = SessionError::Credential { reason: "Invalid login credentials".into() };
    /// assert!(error.is_user_error());
    /// assert!(!SessionError::Transport("timeout".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Credential { .. } | Self::RecoveryRequest { .. })
    }

    /// Returns `true` if local and remote session views may now disagree.
    #[must_use]
    pub const fn diverges_local_state(&self) -> bool {
        matches!(self, Self::SignOut { .. })
    }
}
