//! User-initiated session operations.
//!
//! Thin wrappers over the four mutating [`IdentityService`] calls. They do
//! not write the store on success: the provider's change stream delivers the
//! resulting event. The one exception is a failed sign-out, which clears the
//! local session anyway and still reports the error.

use crate::actions::{AuthChange, SessionAction};
use crate::error::{Result, SessionError};
use crate::provider::SessionProvider;
use crate::providers::{Credentials, IdentityService, SignUpRequest};
use crate::state::Identity;

impl<I> SessionProvider<I>
where
    I: IdentityService + 'static,
{
    /// Register a new account.
    ///
    /// Check [`Identity::is_confirmed`] on the result: an unconfirmed identity
    /// is awaiting email confirmation and no session exists yet.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Credential`] if the provider rejects the sign-up
    /// - [`SessionError::Transport`] if the provider is unreachable
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity> {
        let mut request = SignUpRequest::new(email, password);
        request.display_name = display_name.map(str::to_string);

        self.sign_up_with(request).await
    }

    /// Register a new account with a fully built request.
    ///
    /// # Errors
    ///
    /// Same as [`sign_up`](Self::sign_up).
    pub async fn sign_up_with(&self, request: SignUpRequest) -> Result<Identity> {
        match self.client.sign_up(request).await {
            Ok(identity) => {
                tracing::info!(
                    identity = %identity.id,
                    confirmed = identity.is_confirmed(),
                    "Sign-up accepted"
                );
                Ok(identity)
            }
            Err(error) => {
                tracing::warn!(%error, "Sign-up failed");
                Err(SessionError::from_credential_failure(error))
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// The store moves to `Authenticated` when the provider's `SignedIn`
    /// event arrives, not when this returns.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Credential`] if the credentials are rejected; the
    ///   auth state is left untouched
    /// - [`SessionError::Transport`] if the provider is unreachable
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        match self.client.sign_in(Credentials::new(email, password)).await {
            Ok(identity) => {
                tracing::info!(identity = %identity.id, "Sign-in accepted");
                Ok(identity)
            }
            Err(error) => {
                tracing::warn!(%error, "Sign-in failed");
                Err(SessionError::from_credential_failure(error))
            }
        }
    }

    /// End the session.
    ///
    /// On remote success the store reaches `Unauthenticated` through the
    /// change stream, or directly if that stream has ended. On remote
    /// failure the local session is cleared here and the error is still
    /// returned, so local and remote views may disagree until the provider
    /// catches up. A failure while still bootstrapping clears nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SignOut`] if the remote call fails.
    #[tracing::instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        match self.client.sign_out().await {
            Ok(()) => {
                tracing::info!("Sign-out accepted");
                if !self.is_listening() {
                    tracing::warn!("No live change stream, clearing local session");
                    self.store.dispatch(
                        &self.reducer,
                        SessionAction::RemoteChange(AuthChange::signed_out()),
                        &self.environment,
                    );
                }
                Ok(())
            }
            Err(error) => {
                let reason = error.to_string();
                self.store.dispatch(
                    &self.reducer,
                    SessionAction::ForcedSignOut {
                        reason: reason.clone(),
                    },
                    &self.environment,
                );
                Err(SessionError::SignOut { reason })
            }
        }
    }

    /// Ask the provider to send a password-recovery email.
    ///
    /// Never changes the auth state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RecoveryRequest`] if the provider refuses or
    /// cannot be reached.
    #[tracing::instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.client
            .reset_password_for_email(email.to_string())
            .await
            .map_err(|error| {
                tracing::warn!(%error, "Password recovery request failed");
                SessionError::RecoveryRequest {
                    reason: error.to_string(),
                }
            })
    }
}
