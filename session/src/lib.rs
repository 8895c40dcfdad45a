//! # Composable Session
//!
//! Client-side authenticated session state that stays consistent with a
//! hosted identity provider.
//!
//! The crate answers one question for the rest of an application: *who is
//! using this app right now?* It keeps that answer in a single
//! [`SessionStore`] and reconciles it from three sources:
//!
//! - an initial snapshot fetch of the remote session,
//! - the identity provider's stream of auth-state-change events,
//! - local operations (sign-up, sign-in, sign-out, password reset).
//!
//! When the provider is unreachable or has no session, a fallback identity is
//! installed so consumers can always assume a user exists.
//!
//! ## Architecture
//!
//! State changes are expressed as actions folded by a pure reducer:
//!
//! ```text
//! snapshot / change event / forced sign-out
//!         → SessionAction → SessionReducer → AuthState → listeners
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use composable_session::{SessionConfig, SessionProvider};
//! use std::sync::Arc;
//!
//! let provider = SessionProvider::start(Arc::new(client), SessionConfig::default());
//! let state = provider.store().wait_until_loaded().await;
//! assert!(state.is_authenticated());
//!
//! provider.sign_in("alice@example.com", "hunter2").await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod fallback;
pub mod operations;
pub mod provider;
pub mod providers;
pub mod reducer;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::{AuthChange, AuthChangeKind, SessionAction};
pub use config::{FallbackConfig, SessionConfig, SessionLossPolicy};
pub use environment::{Clock, SessionEnvironment, SystemClock};
pub use error::{Result, ServiceError, SessionError};
pub use fallback::FallbackIdentityGenerator;
pub use provider::SessionProvider;
pub use providers::{AuthChangeStream, Credentials, IdentityService, SignUpRequest};
pub use reducer::{Reducer, SessionReducer};
pub use state::{AuthState, Identity, IdentityId, IdentityKind, Session};
pub use store::{SessionStore, Subscription};
