//! Integration tests for the session provider lifecycle
//!
//! Drives a [`SessionProvider`] against the mock identity service: bootstrap,
//! change-stream reconciliation, the user operations and teardown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_session::constants::FALLBACK_IDENTITY_ID;
use composable_session::mocks::{MockIdentityService, Operation, UnavailableIdentityService};
use composable_session::{
    AuthChange, AuthChangeKind, AuthState, FallbackConfig, IdentityService, ServiceError,
    SessionConfig, SessionError, SessionLossPolicy, SessionProvider, SessionStore,
};
use composable_session_testing::helpers::init_test_tracing;
use composable_session_testing::reducer_test::assertions::{
    assert_authenticated_as, assert_fallback, assert_unauthenticated,
};
use composable_session_testing::{fixtures, test_clock};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

const TIMEOUT: Duration = Duration::from_secs(2);

fn start<I>(client: &Arc<I>, config: SessionConfig) -> SessionProvider<I>
where
    I: IdentityService + 'static,
{
    init_test_tracing();
    SessionProvider::start_with_clock(Arc::clone(client), config, &test_clock())
}

/// Wait until the store holds a state matching `predicate`.
async fn settle<F>(store: &SessionStore, predicate: F) -> AuthState
where
    F: FnMut(&AuthState) -> bool,
{
    let mut watch = store.watch();
    let state = tokio::time::timeout(TIMEOUT, watch.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("session store closed")
        .clone();
    state
}

fn has_session(state: &AuthState) -> bool {
    state.session().is_some()
}

async fn loaded(store: &SessionStore) -> AuthState {
    tokio::time::timeout(TIMEOUT, store.wait_until_loaded())
        .await
        .expect("timed out waiting for bootstrap")
}

/// Record every state a listener is notified with.
fn record(store: &SessionStore) -> (Arc<Mutex<Vec<AuthState>>>, composable_session::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = store.subscribe(move |state| sink.lock().unwrap().push(state.clone()));
    (seen, subscription)
}

async fn wait_for_unsubscribed(client: &MockIdentityService) {
    tokio::time::timeout(TIMEOUT, async {
        while client.subscriber_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("change stream was not released");
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_bootstrap_with_existing_session() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "alice@x.com",
    )));
    let provider = start(&client, SessionConfig::default());

    let state = loaded(provider.store()).await;

    assert_authenticated_as(&state, "alice@x.com");
    assert!(!provider.store().is_loading());
}

#[tokio::test]
async fn test_bootstrap_transport_error_uses_fixed_fallback() {
    let client = Arc::new(UnavailableIdentityService::new("connection refused"));
    let provider = start(&client, SessionConfig::default());

    let state = loaded(provider.store()).await;

    assert_fallback(&state);
    let identity = state.identity().unwrap();
    assert_eq!(identity.id.0, FALLBACK_IDENTITY_ID);
    assert_eq!(identity.created_at, composable_session::environment::Clock::now(&test_clock()));
}

#[tokio::test]
async fn test_bootstrap_uses_configured_fallback() {
    let client = Arc::new(MockIdentityService::new());
    let config = SessionConfig::default().with_fallback(
        FallbackConfig::default()
            .with_email("visitor@example.com")
            .with_display_name("Visitor"),
    );
    let provider = start(&client, config);

    let state = loaded(provider.store()).await;

    let identity = state.identity().unwrap();
    assert!(identity.is_fallback());
    assert_eq!(identity.email, "visitor@example.com");
    assert_eq!(identity.display_name.as_deref(), Some("Visitor"));
}

#[tokio::test]
async fn test_loading_flips_exactly_once() {
    let client = Arc::new(MockIdentityService::new());
    client.hold_snapshot();
    let provider = start(&client, SessionConfig::default());
    let (seen, _subscription) = record(provider.store());

    assert!(provider.store().is_loading());

    client.release_snapshot();
    loaded(provider.store()).await;

    client.emit(AuthChange::signed_in(fixtures::session("alice@x.com")));
    client.emit(AuthChange::signed_out());
    settle(provider.store(), |state| *state == AuthState::Unauthenticated).await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|state| !state.is_loading()));
    assert!(!provider.store().is_loading());
}

#[tokio::test]
async fn test_events_during_bootstrap_apply_after_snapshot() {
    let client = Arc::new(MockIdentityService::new());
    client.hold_snapshot();
    let provider = start(&client, SessionConfig::default());

    client.emit(AuthChange::signed_in(fixtures::session("alice@x.com")));
    client.release_snapshot();

    let state = settle(provider.store(), has_session).await;

    assert_authenticated_as(&state, "alice@x.com");
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_events_are_applied_in_delivery_order() {
    let client = Arc::new(MockIdentityService::new());
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;
    let (seen, _subscription) = record(provider.store());

    let alice = fixtures::session("alice@x.com");
    let bob = fixtures::session("bob@x.com");
    client.emit(AuthChange::signed_in(alice.clone()));
    client.emit(fixtures::change(AuthChangeKind::TokenRefreshed, Some(bob.clone())));
    client.emit(AuthChange::signed_out());

    settle(provider.store(), |state| *state == AuthState::Unauthenticated).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            AuthState::authenticated(alice),
            AuthState::authenticated(bob),
            AuthState::Unauthenticated,
        ]
    );
}

#[tokio::test]
async fn test_user_deleted_signs_out() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "alice@x.com",
    )));
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;

    client.emit(fixtures::change(AuthChangeKind::UserDeleted, None));

    let state = settle(provider.store(), |state| !state.is_authenticated()).await;
    assert_unauthenticated(&state);
}

#[tokio::test]
async fn test_session_loss_unauthenticates_by_default() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "alice@x.com",
    )));
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;

    client.emit(fixtures::change(AuthChangeKind::UserUpdated, None));

    let state = settle(provider.store(), |state| !state.is_authenticated()).await;
    assert_unauthenticated(&state);
}

#[tokio::test]
async fn test_session_loss_can_regenerate_fallback() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "alice@x.com",
    )));
    let config =
        SessionConfig::default().with_session_loss_policy(SessionLossPolicy::RegenerateFallback);
    let provider = start(&client, config);
    loaded(provider.store()).await;

    client.emit(fixtures::change(AuthChangeKind::UserUpdated, None));

    let state = settle(provider.store(), AuthState::is_fallback).await;
    assert_eq!(state.identity().unwrap().id.0, FALLBACK_IDENTITY_ID);
}

// ============================================================================
// Operations
// ============================================================================

#[tokio::test]
async fn test_sign_in_authenticates_through_change_stream() {
    let client = Arc::new(MockIdentityService::new());
    let alice = client.register("alice@x.com", "correct horse");
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;

    let identity = provider.sign_in("alice@x.com", "correct horse").await.unwrap();
    assert_eq!(identity, alice);

    let state = settle(provider.store(), has_session).await;
    assert_eq!(state.identity(), Some(&alice));
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_changes_nothing() {
    let client = Arc::new(MockIdentityService::new());
    client.register("alice@x.com", "correct horse");
    let provider = start(&client, SessionConfig::default());
    let before = loaded(provider.store()).await;

    let result = provider.sign_in("alice@x.com", "battery staple").await;

    assert_eq!(
        result,
        Err(SessionError::Credential {
            reason: "Invalid login credentials".to_string()
        })
    );
    assert!(result.unwrap_err().is_user_error());
    assert_eq!(provider.store().get(), before);
}

#[tokio::test]
async fn test_sign_up_awaiting_confirmation_keeps_state() {
    let client = Arc::new(MockIdentityService::new());
    client.require_confirmation(true);
    let provider = start(&client, SessionConfig::default());
    let before = loaded(provider.store()).await;

    let identity = provider
        .sign_up("carol@x.com", "hunter2", Some("Carol"))
        .await
        .unwrap();

    assert!(!identity.is_confirmed());
    assert_eq!(identity.display_name.as_deref(), Some("Carol"));
    assert_eq!(provider.store().get(), before);
}

#[tokio::test]
async fn test_confirmed_sign_up_authenticates() {
    let client = Arc::new(MockIdentityService::new());
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;

    let identity = provider.sign_up("carol@x.com", "hunter2", None).await.unwrap();

    let state = settle(provider.store(), has_session).await;
    assert_eq!(state.identity(), Some(&identity));
}

#[tokio::test]
async fn test_sign_out_success_goes_through_change_stream() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "bob@x.com",
    )));
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;

    provider.sign_out().await.unwrap();

    let state = settle(provider.store(), |state| !state.is_authenticated()).await;
    assert_unauthenticated(&state);
    assert_eq!(client.calls().last(), Some(&Operation::SignOut));
}

#[tokio::test]
async fn test_sign_out_after_change_stream_ended_clears_locally() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "bob@x.com",
    )));
    let provider = start(&client, SessionConfig::default());
    loaded(provider.store()).await;

    client.end_streams();
    tokio::time::timeout(TIMEOUT, async {
        while provider.is_listening() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("provider did not notice the stream ending");

    provider.sign_out().await.unwrap();

    assert_unauthenticated(&provider.store().get());
}

#[tokio::test]
async fn test_failed_sign_out_during_bootstrap_keeps_loading() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "alice@x.com",
    )));
    client.hold_snapshot();
    client.fail(
        Operation::SignOut,
        ServiceError::Transport("down".to_string()),
    );
    let provider = start(&client, SessionConfig::default());

    let result = provider.sign_out().await;

    assert!(matches!(result, Err(SessionError::SignOut { .. })));
    assert!(provider.store().is_loading());

    client.release_snapshot();

    assert_authenticated_as(&loaded(provider.store()).await, "alice@x.com");
}

#[tokio::test]
async fn test_sign_out_failure_still_clears_local_session() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "bob@x.com",
    )));
    client.fail(
        Operation::SignOut,
        ServiceError::Transport("network down".to_string()),
    );
    let provider = start(&client, SessionConfig::default());
    assert_authenticated_as(&loaded(provider.store()).await, "bob@x.com");

    let result = provider.sign_out().await;

    let error = result.unwrap_err();
    assert!(matches!(error, SessionError::SignOut { .. }));
    assert!(error.diverges_local_state());

    let state = provider.store().get();
    assert_ne!(
        state.identity().map(|identity| identity.email.as_str()),
        Some("bob@x.com")
    );
    assert_unauthenticated(&state);
}

#[tokio::test]
async fn test_reset_password_never_changes_state() {
    let client = Arc::new(MockIdentityService::new());
    let provider = start(&client, SessionConfig::default());
    let before = loaded(provider.store()).await;

    provider.reset_password("alice@x.com").await.unwrap();
    assert_eq!(provider.store().get(), before);
    assert_eq!(client.recovery_requests(), vec!["alice@x.com".to_string()]);

    client.fail(
        Operation::ResetPassword,
        ServiceError::Transport("timeout".to_string()),
    );
    let result = provider.reset_password("alice@x.com").await;

    assert!(matches!(result, Err(SessionError::RecoveryRequest { .. })));
    assert_eq!(provider.store().get(), before);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn test_no_writes_after_teardown() {
    let client = Arc::new(MockIdentityService::new());
    let provider = start(&client, SessionConfig::default());
    let before = loaded(provider.store()).await;
    let (seen, _subscription) = record(provider.store());

    assert!(provider.teardown());
    wait_for_unsubscribed(&client).await;

    assert_eq!(client.emit(AuthChange::signed_in(fixtures::session("alice@x.com"))), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(provider.store().get(), before);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(provider.store().listener_count(), 0);
}

#[tokio::test]
async fn test_teardown_before_bootstrap_resolves() {
    let client = Arc::new(MockIdentityService::with_session(fixtures::session(
        "alice@x.com",
    )));
    client.hold_snapshot();
    let provider = start(&client, SessionConfig::default());
    let store = provider.store().clone();

    provider.teardown();
    client.release_snapshot();
    wait_for_unsubscribed(&client).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(store.is_disposed());
    assert_eq!(store.get(), AuthState::Bootstrapping);
    assert_eq!(loaded(&store).await, AuthState::Bootstrapping);
}

#[tokio::test]
async fn test_drop_releases_change_stream() {
    let client = Arc::new(MockIdentityService::new());
    let provider = start(&client, SessionConfig::default());
    let store = provider.store().clone();
    loaded(&store).await;
    assert_eq!(client.subscriber_count(), 1);

    drop(provider);

    wait_for_unsubscribed(&client).await;
    assert!(store.is_disposed());
}
