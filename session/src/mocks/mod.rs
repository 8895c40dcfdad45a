//! Mock identity services for testing.
//!
//! In-memory implementations of [`IdentityService`](crate::providers::IdentityService)
//! for unit and integration tests.

pub mod identity;
pub mod unavailable;

pub use identity::{MockIdentityService, Operation};
pub use unavailable::UnavailableIdentityService;
