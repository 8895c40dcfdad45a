//! # Composable Session Testing
//!
//! Testing utilities and helpers for `composable-session`.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic fallback identities
//! - Identity and session fixtures
//! - A Given-When-Then harness for the session reducer
//! - proptest strategies for change events
//!
//! ## Example
//!
//! ```ignore
//! use composable_session::{mocks::MockIdentityService, SessionConfig, SessionProvider};
//! use composable_session_testing::{fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn test_bootstrap() {
//!     let session = fixtures::session("alice@x.com");
//!     let client = Arc::new(MockIdentityService::with_session(session));
//!     let provider = SessionProvider::start_with_clock(client, SessionConfig::default(), &test_clock());
//!
//!     let state = provider.store().wait_until_loaded().await;
//!     assert_eq!(state.identity().map(|i| i.email.as_str()), Some("alice@x.com"));
//! }
//! ```

use chrono::{DateTime, Utc};
use composable_session::environment::Clock;


pub use reducer_test::ReducerTest;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_session_testing::mocks::FixedClock;
    /// use composable_session::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Identity, session and environment fixtures.
pub mod fixtures {
    use super::mocks::test_clock;
    use composable_session::{
        AuthChange, AuthChangeKind, Identity, IdentityId, IdentityKind, Session,
        SessionConfig, SessionEnvironment, SessionLossPolicy,
    };
    use std::collections::HashMap;

    /// A confirmed real identity for `email`.
    #[must_use]
    pub fn identity(email: &str) -> Identity {
        let created_at = super::Clock::now(&test_clock());
        Identity {
            id: IdentityId::new(),
            email: email.to_string(),
            display_name: email.split('@').next().map(str::to_string),
            metadata: HashMap::new(),
            created_at,
            role: "authenticated".to_string(),
            kind: IdentityKind::Real,
            confirmed_at: Some(created_at),
        }
    }

    /// A session owned by a fresh identity for `email`.
    #[must_use]
    pub fn session(email: &str) -> Session {
        Session::new(identity(email), format!("test-access-{email}"))
    }

    /// A change event of `kind` carrying `session`.
    #[must_use]
    pub const fn change(kind: AuthChangeKind, session: Option<Session>) -> AuthChange {
        AuthChange { kind, session }
    }

    /// Reducer environment on the fixed test clock.
    #[must_use]
    pub fn environment(policy: SessionLossPolicy) -> SessionEnvironment {
        SessionEnvironment::new(
            &SessionConfig::default().with_session_loss_policy(policy),
            &test_clock(),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Route `tracing` output to the test harness.
    ///
    /// Honors `RUST_LOG`; defaults to `composable_session=debug`. Safe to call
    /// from every test.
    pub fn init_test_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("composable_session=debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use super::fixtures;
    use composable_session::{AuthChange, AuthChangeKind, AuthState, Session};
    use proptest::prelude::*;

    /// Any change kind.
    pub fn arb_kind() -> impl Strategy<Value = AuthChangeKind> {
        prop_oneof![
            Just(AuthChangeKind::InitialSession),
            Just(AuthChangeKind::SignedIn),
            Just(AuthChangeKind::SignedOut),
            Just(AuthChangeKind::TokenRefreshed),
            Just(AuthChangeKind::UserUpdated),
            Just(AuthChangeKind::PasswordRecovery),
            Just(AuthChangeKind::UserDeleted),
        ]
    }

    /// A session for one of a handful of users.
    pub fn arb_session() -> impl Strategy<Value = Session> {
        prop_oneof![
            Just("alice@x.com"),
            Just("bob@x.com"),
            Just("carol@x.com"),
        ]
        .prop_map(fixtures::session)
    }

    /// Any change event, with or without a session.
    pub fn arb_change() -> impl Strategy<Value = AuthChange> {
        (arb_kind(), proptest::option::of(arb_session()))
            .prop_map(|(kind, session)| AuthChange { kind, session })
    }

    /// Any state the store can hold after bootstrap.
    pub fn arb_settled_state() -> impl Strategy<Value = AuthState> {
        prop_oneof![
            arb_session().prop_map(AuthState::authenticated),
            Just(AuthState::fallback(
                fixtures::environment(composable_session::SessionLossPolicy::default())
                    .fallback
                    .generate()
            )),
            Just(AuthState::Unauthenticated),
        ]
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_fixture_identity_is_confirmed_real() {
        let identity = fixtures::identity("alice@x.com");

        assert!(identity.is_confirmed());
        assert!(!identity.is_fallback());
        assert_eq!(identity.display_name.as_deref(), Some("alice"));
    }
}
