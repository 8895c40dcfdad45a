//! Session environment.
//!
//! Dependencies injected into the [`SessionReducer`](crate::reducer::SessionReducer).

use crate::config::{SessionConfig, SessionLossPolicy};
use crate::fallback::FallbackIdentityGenerator;
use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
///
/// # Examples
///
/// ```
/// use composable_session::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert!(clock.now() <= chrono::Utc::now());
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Session environment.
#[derive(Debug, Clone)]
pub struct SessionEnvironment {
    /// Produces the placeholder identity.
    pub fallback: FallbackIdentityGenerator,

    /// Handling of session-less, non-sign-out change events.
    pub session_loss_policy: SessionLossPolicy,
}

impl SessionEnvironment {
    /// Build the environment from configuration.
    #[must_use]
    pub fn new(config: &SessionConfig, clock: &dyn Clock) -> Self {
        Self {
            fallback: FallbackIdentityGenerator::new(&config.fallback, clock),
            session_loss_policy: config.session_loss_policy,
        }
    }
}
