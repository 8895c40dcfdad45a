//! Session state types.
//!
//! This module defines the identity, session and auth-state values held by
//! the [`SessionStore`](crate::store::SessionStore). All types are `Clone` so
//! observers receive owned snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub uuid::Uuid);

impl IdentityId {
    /// Generate a new random `IdentityId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════

/// Where an identity came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// Issued by the identity provider.
    #[default]
    Real,

    /// Synthesized locally. Never persisted, never sent to the provider.
    Fallback,
}

/// A user as seen by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity ID.
    pub id: IdentityId,

    /// Email address.
    pub email: String,

    /// Display name.
    pub display_name: Option<String>,

    /// Provider-defined user metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Role tag (e.g. `"authenticated"`).
    pub role: String,

    /// Real or fallback.
    #[serde(default)]
    pub kind: IdentityKind,

    /// When the email address was confirmed, if it has been.
    ///
    /// A freshly signed-up identity without this marker is awaiting
    /// confirmation and has no session yet.
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Returns `true` if the identity was synthesized locally.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.kind, IdentityKind::Fallback)
    }

    /// Returns `true` if the identity provider has confirmed this identity.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// Credential bundle issued by the identity provider.
///
/// Only presence or absence matters to this crate; the tokens are carried
/// through untouched and redacted from `Debug` output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer access token.
    pub access_token: String,

    /// Refresh token, if the provider issued one.
    pub refresh_token: Option<String>,

    /// Access token expiration timestamp.
    pub expires_at: Option<DateTime<Utc>>,

    /// The identity that owns this session.
    pub identity: Identity,
}

impl Session {
    /// Create a session for `identity` with the given access token.
    #[must_use]
    pub fn new(identity: Identity, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            identity,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Auth State
// ═══════════════════════════════════════════════════════════════════════

/// Current authentication state.
///
/// Exactly one variant holds at any instant. The store starts in
/// `Bootstrapping` and never returns to it.
///
/// # Examples
///
/// ```
/// # use composable_session::AuthState;
/// let state = AuthState::default();
/// assert!(state.is_loading());
/// assert!(state.identity().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthState {
    /// Snapshot fetch has not resolved yet.
    #[default]
    Bootstrapping,

    /// Signed in with a real session.
    Authenticated {
        /// Identity that owns the session.
        identity: Identity,
        /// The live session.
        session: Session,
    },

    /// No real session; running as the fallback identity.
    AuthenticatedFallback {
        /// The locally synthesized identity.
        identity: Identity,
    },

    /// Explicitly signed out.
    Unauthenticated,
}

impl AuthState {
    /// Build the `Authenticated` state owned by `session`.
    ///
    /// An identity backed by a session is always real, whatever kind it
    /// arrived with.
    #[must_use]
    pub fn authenticated(mut session: Session) -> Self {
        session.identity.kind = IdentityKind::Real;
        Self::Authenticated {
            identity: session.identity.clone(),
            session,
        }
    }

    /// Build the `AuthenticatedFallback` state.
    #[must_use]
    pub const fn fallback(identity: Identity) -> Self {
        Self::AuthenticatedFallback { identity }
    }

    /// `true` until the bootstrap snapshot fetch resolves.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Bootstrapping)
    }

    /// Current identity, real or fallback.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity, .. } | Self::AuthenticatedFallback { identity } => {
                Some(identity)
            }
            Self::Bootstrapping | Self::Unauthenticated => None,
        }
    }

    /// Current session. Only present for real identities.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated { session, .. } => Some(session),
            _ => None,
        }
    }

    /// `true` when some identity, real or fallback, is installed.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(
            self,
            Self::Authenticated { .. } | Self::AuthenticatedFallback { .. }
        )
    }

    /// `true` when running as the fallback identity.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::AuthenticatedFallback { .. })
    }

    /// Variant name used in logs.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Bootstrapping => "bootstrapping",
            Self::Authenticated { .. } => "authenticated",
            Self::AuthenticatedFallback { .. } => "authenticated_fallback",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}
