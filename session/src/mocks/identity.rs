//! Mock identity service for testing.

use crate::actions::AuthChange;
use crate::constants::AUTHENTICATED_ROLE;
use crate::error::ServiceError;
use crate::providers::{AuthChangeStream, Credentials, IdentityService, SignUpRequest};
use crate::state::{Identity, IdentityId, IdentityKind, Session};
use chrono::Utc;
use futures::StreamExt;
use futures::channel::mpsc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Identity service calls, as recorded by [`MockIdentityService::calls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get_session`
    GetSession,
    /// `sign_up`
    SignUp,
    /// `sign_in`
    SignIn,
    /// `sign_out`
    SignOut,
    /// `reset_password_for_email`
    ResetPassword,
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

#[derive(Debug, Default)]
struct MockState {
    snapshot: Option<Session>,
    snapshot_gate: Option<Arc<Notify>>,
    accounts: HashMap<String, Account>,
    failures: HashMap<Operation, ServiceError>,
    subscribers: Vec<mpsc::UnboundedSender<AuthChange>>,
    calls: Vec<Operation>,
    recovery_requests: Vec<String>,
    require_confirmation: bool,
}

impl MockState {
    fn record(&mut self, operation: Operation) -> Option<ServiceError> {
        self.calls.push(operation);
        self.failures.get(&operation).cloned()
    }

    fn broadcast(&mut self, change: &AuthChange) -> usize {
        self.subscribers
            .retain(|subscriber| subscriber.unbounded_send(change.clone()).is_ok());
        self.subscribers.len()
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_identity(
    email: &str,
    display_name: Option<String>,
    metadata: HashMap<String, serde_json::Value>,
    confirmed: bool,
) -> Identity {
    let now = Utc::now();
    Identity {
        id: IdentityId::new(),
        email: email.to_string(),
        display_name,
        metadata,
        created_at: now,
        role: AUTHENTICATED_ROLE.to_string(),
        kind: IdentityKind::Real,
        confirmed_at: confirmed.then_some(now),
    }
}

/// Mock identity service.
///
/// Behaves like a hosted provider: successful sign-in and sign-out are
/// followed by the matching event on every live subscription. Failures can be
/// injected per [`Operation`], and [`emit`](Self::emit) delivers arbitrary
/// events.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityService {
    state: Arc<Mutex<MockState>>,
}

impl MockIdentityService {
    /// Create a mock with no session and no accounts.
    ///
    /// Sign-ups complete immediately (no email confirmation step).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose snapshot returns `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        let mock = Self::new();
        mock.set_session(Some(session));
        mock
    }

    /// Set the session returned by `get_session`.
    pub fn set_session(&self, session: Option<Session>) {
        lock(&self.state).snapshot = session;
    }

    /// Require email confirmation after sign-up.
    ///
    /// Sign-ups then return an unconfirmed identity and emit no event.
    pub fn require_confirmation(&self, required: bool) {
        lock(&self.state).require_confirmation = required;
    }

    /// Make `get_session` wait until [`release_snapshot`](Self::release_snapshot).
    pub fn hold_snapshot(&self) {
        lock(&self.state).snapshot_gate = Some(Arc::new(Notify::new()));
    }

    /// Let a held `get_session` call resolve.
    pub fn release_snapshot(&self) {
        if let Some(gate) = lock(&self.state).snapshot_gate.take() {
            gate.notify_one();
        }
    }

    /// Register a confirmed account and return its identity.
    pub fn register(&self, email: &str, password: &str) -> Identity {
        let identity = new_identity(email, None, HashMap::new(), true);
        lock(&self.state).accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        identity
    }

    /// Make every call to `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: ServiceError) {
        lock(&self.state).failures.insert(operation, error);
    }

    /// Undo [`fail`](Self::fail) for `operation`.
    pub fn succeed(&self, operation: Operation) {
        lock(&self.state).failures.remove(&operation);
    }

    /// Deliver `change` to every live subscription.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn emit(&self, change: AuthChange) -> usize {
        lock(&self.state).broadcast(&change)
    }

    /// End every live change stream, as a provider dropping the connection
    /// would.
    pub fn end_streams(&self) {
        lock(&self.state).subscribers.clear();
    }

    /// Number of subscriptions whose stream is still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut state = lock(&self.state);
        state.subscribers.retain(|subscriber| !subscriber.is_closed());
        state.subscribers.len()
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        lock(&self.state).calls.clone()
    }

    /// Emails passed to `reset_password_for_email` that succeeded.
    #[must_use]
    pub fn recovery_requests(&self) -> Vec<String> {
        lock(&self.state).recovery_requests.clone()
    }

    /// Build a session for `identity` with a fresh mock token.
    #[must_use]
    pub fn session_for(identity: Identity) -> Session {
        Session::new(identity, format!("mock-access-{}", uuid::Uuid::new_v4()))
    }
}

impl IdentityService for MockIdentityService {
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, ServiceError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            let gate = {
                let mut guard = lock(&state);
                guard.calls.push(Operation::GetSession);
                guard.snapshot_gate.clone()
            };

            if let Some(gate) = gate {
                gate.notified().await;
            }

            let guard = lock(&state);
            if let Some(error) = guard.failures.get(&Operation::GetSession) {
                return Err(error.clone());
            }
            Ok(guard.snapshot.clone())
        }
    }

    fn subscribe(&self) -> AuthChangeStream {
        let (sender, receiver) = mpsc::unbounded();
        lock(&self.state).subscribers.push(sender);
        receiver.boxed()
    }

    fn sign_up(
        &self,
        request: SignUpRequest,
    ) -> impl Future<Output = Result<Identity, ServiceError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            let mut guard = lock(&state);
            if let Some(error) = guard.record(Operation::SignUp) {
                return Err(error);
            }

            let email = request.credentials.email;
            if guard.accounts.contains_key(&email) {
                return Err(ServiceError::Rejected {
                    reason: "User already registered".to_string(),
                });
            }

            let confirmed = !guard.require_confirmation;
            let identity = new_identity(&email, request.display_name, request.metadata, confirmed);
            guard.accounts.insert(
                email,
                Account {
                    password: request.credentials.password,
                    identity: identity.clone(),
                },
            );

            if confirmed {
                let session = Self::session_for(identity.clone());
                guard.snapshot = Some(session.clone());
                guard.broadcast(&AuthChange::signed_in(session));
            }

            Ok(identity)
        }
    }

    fn sign_in(
        &self,
        credentials: Credentials,
    ) -> impl Future<Output = Result<Identity, ServiceError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            let mut guard = lock(&state);
            if let Some(error) = guard.record(Operation::SignIn) {
                return Err(error);
            }

            let identity = match guard.accounts.get(&credentials.email) {
                Some(account) if account.password == credentials.password => {
                    account.identity.clone()
                }
                _ => {
                    return Err(ServiceError::Rejected {
                        reason: "Invalid login credentials".to_string(),
                    });
                }
            };

            if !identity.is_confirmed() {
                return Err(ServiceError::Rejected {
                    reason: "Email not confirmed".to_string(),
                });
            }

            let session = Self::session_for(identity.clone());
            guard.snapshot = Some(session.clone());
            guard.broadcast(&AuthChange::signed_in(session));

            Ok(identity)
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), ServiceError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            let mut guard = lock(&state);
            if let Some(error) = guard.record(Operation::SignOut) {
                return Err(error);
            }

            guard.snapshot = None;
            guard.broadcast(&AuthChange::signed_out());
            Ok(())
        }
    }

    fn reset_password_for_email(
        &self,
        email: String,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            let mut guard = lock(&state);
            if let Some(error) = guard.record(Operation::ResetPassword) {
                return Err(error);
            }

            guard.recovery_requests.push(email);
            Ok(())
        }
    }
}
