//! Session constants.

use uuid::Uuid;

/// Fixed id of the fallback identity.
pub const FALLBACK_IDENTITY_ID: Uuid = Uuid::nil();

/// Placeholder email of the fallback identity.
pub const FALLBACK_EMAIL: &str = "guest@localhost";

/// Placeholder display name of the fallback identity.
pub const FALLBACK_DISPLAY_NAME: &str = "Guest";

/// Role tag carried by every identity this crate synthesizes.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Metadata key set to `true` on the fallback identity.
pub const FALLBACK_METADATA_KEY: &str = "fallback";

/// Metric names.
pub mod metric_names {
    /// Committed state transitions.
    pub const TRANSITIONS: &str = "session.transitions";

    /// Bootstraps that ended on the fallback identity.
    pub const BOOTSTRAP_FALLBACK: &str = "session.bootstrap.fallback";

    /// Local clears after a failed remote sign-out.
    pub const SIGN_OUT_FORCED_CLEAR: &str = "session.sign_out.forced_clear";

    /// Writes and events dropped because the store was disposed.
    pub const EVENTS_DISCARDED: &str = "session.events.discarded";
}
