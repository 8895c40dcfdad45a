//! Fallback identity generation.
//!
//! The fallback identity stands in for a user when the identity provider is
//! unreachable or reports no session. It has a fixed id, the
//! `"authenticated"` role and placeholder contact details. It is never
//! persisted and never sent to the provider.

use crate::config::FallbackConfig;
use crate::constants::{AUTHENTICATED_ROLE, FALLBACK_METADATA_KEY};
use crate::environment::Clock;
use crate::state::{Identity, IdentityId, IdentityKind};
use std::collections::HashMap;

/// Produces the placeholder identity.
///
/// The creation timestamp is taken once, when the generator is built, so
/// every call to [`generate`](Self::generate) returns an identical value.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackIdentityGenerator {
    template: Identity,
}

impl FallbackIdentityGenerator {
    /// Create a generator from configured placeholders.
    #[must_use]
    pub fn new(config: &FallbackConfig, clock: &dyn Clock) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            FALLBACK_METADATA_KEY.to_string(),
            serde_json::Value::Bool(true),
        );

        Self {
            template: Identity {
                id: IdentityId(config.id),
                email: config.email.clone(),
                display_name: Some(config.display_name.clone()),
                metadata,
                created_at: clock.now(),
                role: AUTHENTICATED_ROLE.to_string(),
                kind: IdentityKind::Fallback,
                confirmed_at: None,
            },
        }
    }

    /// Produce the fallback identity.
    #[must_use]
    pub fn generate(&self) -> Identity {
        self.template.clone()
    }

    /// Fixed id every generated identity carries.
    #[must_use]
    pub const fn id(&self) -> IdentityId {
        self.template.id
    }
}
