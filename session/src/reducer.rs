//! Session reducer.
//!
//! The fold that turns bootstrap results, change events and forced
//! sign-outs into the next [`AuthState`]. It performs no I/O; the
//! [`SessionStore`](crate::store::SessionStore) runs it under its write lock
//! so each action is applied atomically.

use crate::actions::{AuthChange, SessionAction};
use crate::config::SessionLossPolicy;
use crate::environment::SessionEnvironment;
use crate::state::AuthState;

/// The Reducer trait - core abstraction for state transitions.
///
/// # Example
///
/// ```
/// use composable_session::{
///     AuthState, Reducer, SessionAction, SessionConfig, SessionEnvironment, SessionReducer,
///     SystemClock,
/// };
///
/// let env = SessionEnvironment::new(&SessionConfig::default(), &SystemClock);
/// let mut state = AuthState::Bootstrapping;
///
/// SessionReducer::new().reduce(&mut state, SessionAction::SnapshotLoaded { session: None }, &env);
/// assert!(state.is_fallback());
/// ```
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Apply `action` to `state` in place.
    fn reduce(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment);
}

/// Reducer for [`AuthState`].
///
/// # Rules
///
/// - A bootstrap result only applies while the state is `Bootstrapping`.
///   A session becomes `Authenticated`; no session or a failed fetch becomes
///   `AuthenticatedFallback`.
/// - A change event carrying a session always becomes `Authenticated`,
///   whatever came before.
/// - A sign-out event without a session becomes `Unauthenticated`.
/// - Any other session-less event follows the [`SessionLossPolicy`]; a
///   fallback state is left as is.
/// - A forced sign-out becomes `Unauthenticated`, except while
///   `Bootstrapping`, where there is nothing local to clear yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fold_change(state: &mut AuthState, change: AuthChange, env: &SessionEnvironment) {
        if let Some(session) = change.session {
            *state = AuthState::authenticated(session);
            return;
        }

        if change.kind.is_sign_out() {
            *state = AuthState::Unauthenticated;
            return;
        }

        if state.is_fallback() {
            tracing::debug!(kind = %change.kind, "Session-less event while on fallback identity");
            return;
        }

        match env.session_loss_policy {
            SessionLossPolicy::Unauthenticate => {
                tracing::info!(kind = %change.kind, "Session lost, treating as sign-out");
                *state = AuthState::Unauthenticated;
            }
            SessionLossPolicy::RegenerateFallback => {
                tracing::info!(kind = %change.kind, "Session lost, regenerating fallback identity");
                *state = AuthState::fallback(env.fallback.generate());
            }
        }
    }
}

impl Reducer for SessionReducer {
    type State = AuthState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    fn reduce(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment) {
        match action {
            SessionAction::SnapshotLoaded { session } => {
                if !state.is_loading() {
                    tracing::debug!(
                        current = state.variant_name(),
                        "Snapshot resolved after bootstrap, discarding"
                    );
                    return;
                }

                *state = match session {
                    Some(session) => AuthState::authenticated(session),
                    None => {
                        tracing::info!("No remote session, using fallback identity");
                        metrics::counter!(crate::constants::metric_names::BOOTSTRAP_FALLBACK)
                            .increment(1);
                        AuthState::fallback(env.fallback.generate())
                    }
                };
            }

            SessionAction::SnapshotFailed { reason } => {
                if !state.is_loading() {
                    tracing::debug!(%reason, "Snapshot failed after bootstrap, discarding");
                    return;
                }

                tracing::warn!(%reason, "Session snapshot fetch failed, using fallback identity");
                metrics::counter!(crate::constants::metric_names::BOOTSTRAP_FALLBACK).increment(1);
                *state = AuthState::fallback(env.fallback.generate());
            }

            SessionAction::RemoteChange(change) => Self::fold_change(state, change, env),

            SessionAction::ForcedSignOut { reason } => {
                if state.is_loading() {
                    tracing::debug!(%reason, "Sign-out failed before bootstrap, nothing to clear");
                    return;
                }

                tracing::warn!(%reason, "Remote sign-out failed, clearing local session");
                metrics::counter!(crate::constants::metric_names::SIGN_OUT_FORCED_CLEAR)
                    .increment(1);
                *state = AuthState::Unauthenticated;
            }
        }
    }
}
