//! Identity provider interface.
//!
//! The hosted identity provider (token issuance, password hashing, email
//! delivery) is consumed as an opaque capability through the
//! [`IdentityService`] trait. The session core never implements it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   get_session / subscribe   ┌──────────────────┐
//! │ SessionProvider  │ ──────────────────────────▶ │ IdentityService  │
//! │ - bootstrap      │                             │ (hosted)         │
//! │ - reconcile loop │ ◀────── AuthChange stream ─ │                  │
//! │ - operations     │ ── sign_up / sign_in / ───▶ │                  │
//! └──────────────────┘    sign_out / reset         └──────────────────┘
//! ```
//!
//! This enables:
//! - **Testing**: Use mocks (in-memory, deterministic)
//! - **Production**: Use the real provider SDK or HTTP client

use crate::actions::AuthChange;
use crate::error::ServiceError;
use crate::state::{Identity, Session};
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

/// Stream of auth-state-change events.
///
/// Dropping the stream releases the subscription.
pub type AuthChangeStream = BoxStream<'static, AuthChange>;

/// Email and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Email address.
    pub email: String,

    /// Plaintext password, handed straight to the provider.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    /// Email and password.
    pub credentials: Credentials,

    /// Display name to store with the account.
    pub display_name: Option<String>,

    /// Extra user metadata to store with the account.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SignUpRequest {
    /// Create a sign-up request without attributes.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(email, password),
            display_name: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Hosted identity provider.
///
/// # Implementation Notes
///
/// - `subscribe` must return immediately; events are delivered through the
///   returned stream in the order they occur
/// - Successful sign-in and sign-out are expected to be followed by a
///   matching event on every live stream
/// - Errors are reported as [`ServiceError`]; the session core decides how
///   each one surfaces to callers
pub trait IdentityService: Send + Sync {
    /// Fetch the current session snapshot.
    ///
    /// # Returns
    ///
    /// The session if one exists, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Transport`] if the provider is unreachable.
    fn get_session(
        &self,
    ) -> impl Future<Output = std::result::Result<Option<Session>, ServiceError>> + Send;

    /// Subscribe to auth-state-change events.
    fn subscribe(&self) -> AuthChangeStream;

    /// Register a new account.
    ///
    /// # Returns
    ///
    /// The new identity. It is unconfirmed if the provider requires email
    /// confirmation before issuing a session.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails → [`ServiceError::Transport`]
    /// - The account exists or the password is refused → [`ServiceError::Rejected`]
    fn sign_up(
        &self,
        request: SignUpRequest,
    ) -> impl Future<Output = std::result::Result<Identity, ServiceError>> + Send;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails → [`ServiceError::Transport`]
    /// - Credentials are invalid → [`ServiceError::Rejected`]
    fn sign_in(
        &self,
        credentials: Credentials,
    ) -> impl Future<Output = std::result::Result<Identity, ServiceError>> + Send;

    /// End the current session remotely.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot revoke the session.
    fn sign_out(&self) -> impl Future<Output = std::result::Result<(), ServiceError>> + Send;

    /// Start the out-of-band password recovery flow for `email`.
    ///
    /// # Errors
    ///
    /// Returns error if the provider refuses or cannot be reached.
    fn reset_password_for_email(
        &self,
        email: String,
    ) -> impl Future<Output = std::result::Result<(), ServiceError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("alice@x.com", "hunter2");
        let rendered = format!("{credentials:?}");

        assert!(rendered.contains("alice@x.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_sign_up_request_builder() {
        let request = SignUpRequest::new("alice@x.com", "hunter2")
            .with_display_name("Alice")
            .with_metadata("plan", serde_json::json!("free"));

        assert_eq!(request.credentials.email, "alice@x.com");
        assert_eq!(request.display_name.as_deref(), Some("Alice"));
        assert_eq!(request.metadata.get("plan"), Some(&serde_json::json!("free")));
    }
}
