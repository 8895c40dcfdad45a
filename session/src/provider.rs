//! Session provider.
//!
//! Owns the [`SessionStore`] and the reconciliation task that keeps it in
//! sync with an [`IdentityService`]:
//!
//! 1. Subscribe to the change stream (held from construction to teardown)
//! 2. Fetch the session snapshot and commit the bootstrap result
//! 3. Fold every change event, in delivery order, into the store
//!
//! Teardown disposes the store, aborts the task and drops the stream. It
//! runs exactly once, either explicitly or when the provider is dropped.

use crate::actions::SessionAction;
use crate::config::SessionConfig;
use crate::constants::metric_names;
use crate::environment::{Clock, SessionEnvironment, SystemClock};
use crate::providers::{AuthChangeStream, IdentityService};
use crate::reducer::SessionReducer;
use crate::store::SessionStore;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Application-root session service.
///
/// Construct once and pass by reference (or clone the [`SessionStore`]) to
/// consumers.
///
/// # Type Parameters
///
/// - `I`: Identity service client
pub struct SessionProvider<I>
where
    I: IdentityService + 'static,
{
    pub(crate) client: Arc<I>,
    pub(crate) store: SessionStore,
    pub(crate) reducer: SessionReducer,
    pub(crate) environment: Arc<SessionEnvironment>,
    task: Mutex<Option<JoinHandle<()>>>,
    stream_open: Arc<AtomicBool>,
    torn_down: AtomicBool,
}

impl<I> SessionProvider<I>
where
    I: IdentityService + 'static,
{
    /// Start the provider with the system clock.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start(client: Arc<I>, config: SessionConfig) -> Self {
        Self::start_with_clock(client, config, &SystemClock)
    }

    /// Start the provider.
    ///
    /// The change stream is acquired before this returns. Events delivered
    /// while the snapshot fetch is pending are buffered and folded after the
    /// bootstrap result.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start_with_clock(client: Arc<I>, config: SessionConfig, clock: &dyn Clock) -> Self {
        let environment = Arc::new(SessionEnvironment::new(&config, clock));
        let store = SessionStore::new();
        let reducer = SessionReducer::new();
        let changes = client.subscribe();
        let stream_open = Arc::new(AtomicBool::new(true));

        tracing::info!(
            session_loss_policy = ?environment.session_loss_policy,
            "Starting session provider"
        );

        let task = tokio::spawn(reconcile(
            Arc::clone(&client),
            store.clone(),
            reducer,
            Arc::clone(&environment),
            changes,
            Arc::clone(&stream_open),
        ));

        Self {
            client,
            store,
            reducer,
            environment,
            task: Mutex::new(Some(task)),
            stream_open,
            torn_down: AtomicBool::new(false),
        }
    }

    /// The session store.
    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The identity service client.
    #[must_use]
    pub const fn client(&self) -> &Arc<I> {
        &self.client
    }

    /// The reducer environment.
    #[must_use]
    pub fn environment(&self) -> &SessionEnvironment {
        &self.environment
    }

    /// `true` while the change stream can still deliver events.
    ///
    /// Turns `false` when the identity service ends the stream or the
    /// provider is torn down.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.stream_open.load(Ordering::Acquire) && !self.is_torn_down()
    }

    /// `true` once [`teardown`](Self::teardown) has run.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Release the change subscription and stop all further state writes.
    ///
    /// Safe to call at any point, including before bootstrap resolves.
    /// Returns `false` if teardown already happened.
    pub fn teardown(&self) -> bool {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.store.dispose();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }

        tracing::info!("Session provider torn down");
        true
    }
}

impl<I> Drop for SessionProvider<I>
where
    I: IdentityService + 'static,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<I> std::fmt::Debug for SessionProvider<I>
where
    I: IdentityService + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("store", &self.store)
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}

/// Bootstrap the store, then fold the change stream into it.
async fn reconcile<I>(
    client: Arc<I>,
    store: SessionStore,
    reducer: SessionReducer,
    environment: Arc<SessionEnvironment>,
    mut changes: AuthChangeStream,
    stream_open: Arc<AtomicBool>,
) where
    I: IdentityService,
{
    let bootstrap = match client.get_session().await {
        Ok(session) => {
            tracing::debug!(has_session = session.is_some(), "Session snapshot fetched");
            SessionAction::SnapshotLoaded { session }
        }
        Err(error) => SessionAction::SnapshotFailed {
            reason: error.to_string(),
        },
    };
    store.dispatch(&reducer, bootstrap, &environment);

    while let Some(change) = changes.next().await {
        if store.is_disposed() {
            metrics::counter!(metric_names::EVENTS_DISCARDED).increment(1);
            break;
        }

        tracing::debug!(
            kind = %change.kind,
            has_session = change.session.is_some(),
            "Auth state change received"
        );
        store.dispatch(&reducer, SessionAction::RemoteChange(change), &environment);
    }

    if store.is_disposed() {
        tracing::debug!("Auth change stream released");
    } else {
        tracing::warn!("Auth change stream ended, remote changes will no longer be applied");
        stream_open.store(false, Ordering::Release);
    }
}
