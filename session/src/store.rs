//! Session store.
//!
//! The process-wide holder of the current [`AuthState`]. It is constructed
//! once at the application root (by [`SessionProvider`](crate::SessionProvider))
//! and handed to consumers by reference or clone. Consumers only read:
//! [`get`](SessionStore::get), [`subscribe`](SessionStore::subscribe) and
//! [`watch`](SessionStore::watch). Writes are crate-private and come only
//! from the reconciliation loop and the sign-out operation.
//!
//! # Concurrency
//!
//! - Writes are serialized; each one replaces the whole state, so no
//!   observer sees a half-updated value
//! - Listeners run synchronously, in registration order, after the write has
//!   been committed and outside the state lock (listeners may call `get`)
//! - After [`dispose`](SessionStore::dispose) every write is discarded

use crate::actions::SessionAction;
use crate::constants::metric_names;
use crate::environment::SessionEnvironment;
use crate::reducer::Reducer;
use crate::state::AuthState;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tokio::sync::watch;

type Listener = Arc<dyn Fn(&AuthState) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    state: RwLock<AuthState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    /// Serializes commits so listener notifications follow write order.
    write: Mutex<()>,
    disposed: AtomicBool,
    watch: watch::Sender<AuthState>,
}

/// Reactive holder of the current [`AuthState`].
///
/// Cloning is cheap and every clone observes the same state.
///
/// # Examples
///
/// ```
/// # use composable_session::SessionStore;
/// let store = SessionStore::new();
/// assert!(store.is_loading());
///
/// let subscription = store.subscribe(|state| println!("now {}", state.variant_name()));
/// subscription.unsubscribe();
/// ```
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl SessionStore {
    /// Create a store in the `Bootstrapping` state.
    #[must_use]
    pub fn new() -> Self {
        let (watch, _) = watch::channel(AuthState::Bootstrapping);

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(AuthState::Bootstrapping),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                write: Mutex::new(()),
                disposed: AtomicBool::new(false),
                watch,
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> AuthState {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `true` until the bootstrap snapshot fetch resolves.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_loading()
    }

    /// Register `listener` to run on every committed transition.
    ///
    /// The listener receives the new state. It is not called with the
    /// current state on registration; call [`get`](Self::get) for that.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).push((id, Arc::new(listener)));

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
            active: true,
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }

    /// Async view of the state for tasks that prefer awaiting over callbacks.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.shared.watch.subscribe()
    }

    /// Wait until the bootstrap snapshot fetch has resolved.
    ///
    /// Also resolves when the store is disposed, returning the state it was
    /// left in (still `Bootstrapping` if teardown came first).
    pub async fn wait_until_loaded(&self) -> AuthState {
        let mut receiver = self.watch();
        let loaded = receiver
            .wait_for(|state| !state.is_loading() || self.is_disposed())
            .await
            .map(|state| state.clone());

        loaded.unwrap_or_else(|_| self.get())
    }

    /// `true` once the owning provider has been torn down.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Stop accepting writes.
    ///
    /// Waits for a write in progress, including its listener notifications.
    /// Returns `false` if the store was already disposed.
    pub(crate) fn dispose(&self) -> bool {
        let _write = lock(&self.shared.write);

        let first = !self.shared.disposed.swap(true, Ordering::AcqRel);
        if first {
            lock(&self.shared.listeners).clear();
            // Wake `wait_until_loaded` callers.
            self.shared.watch.send_modify(|_| {});
        }
        first
    }

    /// Fold `action` into the state with `reducer` as a single atomic write.
    ///
    /// Returns `true` if the state changed.
    pub(crate) fn dispatch<R>(
        &self,
        reducer: &R,
        action: SessionAction,
        env: &SessionEnvironment,
    ) -> bool
    where
        R: Reducer<State = AuthState, Action = SessionAction, Environment = SessionEnvironment>,
    {
        self.commit(|state| reducer.reduce(state, action, env))
    }

    /// Replace the state.
    ///
    /// Returns `true` if the state changed.
    #[cfg(test)]
    pub(crate) fn set(&self, next: AuthState) -> bool {
        self.commit(|state| *state = next)
    }

    fn commit(&self, mutate: impl FnOnce(&mut AuthState)) -> bool {
        let _write = lock(&self.shared.write);

        if self.is_disposed() {
            tracing::debug!("Session store disposed, discarding write");
            metrics::counter!(metric_names::EVENTS_DISCARDED).increment(1);
            return false;
        }

        let (previous, next) = {
            let mut state = self
                .shared
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);

            let mut next = state.clone();
            mutate(&mut next);

            if next == *state {
                return false;
            }
            if next.is_loading() {
                tracing::warn!(
                    current = state.variant_name(),
                    "Refusing transition back to bootstrapping"
                );
                return false;
            }

            let previous = state.variant_name();
            *state = next.clone();
            (previous, next)
        };

        tracing::info!(
            from = previous,
            to = next.variant_name(),
            identity = ?next.identity().map(|identity| identity.id),
            "Session state transition"
        );
        metrics::counter!(metric_names::TRANSITIONS).increment(1);

        self.shared.watch.send_replace(next.clone());

        let listeners: Vec<Listener> = lock(&self.shared.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }

        true
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.get().variant_name())
            .field("listeners", &self.listener_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle returned by [`SessionStore::subscribe`].
///
/// The listener is removed on [`unsubscribe`](Self::unsubscribe) or drop,
/// whichever comes first.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
    active: bool,
}

impl Subscription {
    /// Remove the listener.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// `true` until the listener has been removed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            && self.shared.upgrade().is_some_and(|shared| {
                lock(&shared.listeners).iter().any(|(id, _)| *id == self.id)
            })
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
