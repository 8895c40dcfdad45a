//! Session configuration.
//!
//! Configuration values should be provided by the application. The defaults
//! match the placeholder constants in [`crate::constants`].

use crate::constants::{FALLBACK_DISPLAY_NAME, FALLBACK_EMAIL, FALLBACK_IDENTITY_ID};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the reconciliation loop does with a change event that carries no
/// session and is not a sign-out.
///
/// An already-fallback state is left alone under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLossPolicy {
    /// Treat the lost session like a sign-out.
    #[default]
    Unauthenticate,

    /// Install a fresh fallback identity. This hides a lost session from
    /// consumers, so it has to be opted into.
    RegenerateFallback,
}

/// Placeholder values for the fallback identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Fixed identity id.
    pub id: Uuid,

    /// Placeholder email.
    pub email: String,

    /// Placeholder display name.
    pub display_name: String,
}

impl FallbackConfig {
    /// Set the fixed identity id.
    #[must_use]
    pub const fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the placeholder email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Set the placeholder display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            id: FALLBACK_IDENTITY_ID,
            email: FALLBACK_EMAIL.to_string(),
            display_name: FALLBACK_DISPLAY_NAME.to_string(),
        }
    }
}

/// Session provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fallback identity placeholders.
    pub fallback: FallbackConfig,

    /// Handling of session-less, non-sign-out change events.
    ///
    /// Default: [`SessionLossPolicy::Unauthenticate`]
    pub session_loss_policy: SessionLossPolicy,
}

impl SessionConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback identity placeholders.
    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackConfig) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the session-loss policy.
    #[must_use]
    pub const fn with_session_loss_policy(mut self, policy: SessionLossPolicy) -> Self {
        self.session_loss_policy = policy;
        self
    }
}
