//! Identity service that is never reachable.

use crate::actions::AuthChange;
use crate::error::ServiceError;
use crate::providers::{AuthChangeStream, Credentials, IdentityService, SignUpRequest};
use crate::state::{Identity, Session};
use futures::StreamExt;
use std::future::Future;

/// Identity service whose every call fails with a transport error.
///
/// Its change stream stays open and silent.
#[derive(Debug, Clone)]
pub struct UnavailableIdentityService {
    message: String,
}

impl UnavailableIdentityService {
    /// Create a service failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn error(&self) -> ServiceError {
        ServiceError::Transport(self.message.clone())
    }
}

impl IdentityService for UnavailableIdentityService {
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, ServiceError>> + Send {
        let error = self.error();
        async move { Err(error) }
    }

    fn subscribe(&self) -> AuthChangeStream {
        futures::stream::pending::<AuthChange>().boxed()
    }

    fn sign_up(
        &self,
        _request: SignUpRequest,
    ) -> impl Future<Output = Result<Identity, ServiceError>> + Send {
        let error = self.error();
        async move { Err(error) }
    }

    fn sign_in(
        &self,
        _credentials: Credentials,
    ) -> impl Future<Output = Result<Identity, ServiceError>> + Send {
        let error = self.error();
        async move { Err(error) }
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), ServiceError>> + Send {
        let error = self.error();
        async move { Err(error) }
    }

    fn reset_password_for_email(
        &self,
        _email: String,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send {
        let error = self.error();
        async move { Err(error) }
    }
}
