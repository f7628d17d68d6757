//! # Gatepass Service
//!
//! Business logic for attendee registration and check-in.
//!
//! The user service composes the role policy, the uid allocator, object
//! storage and token issuance behind a cache-aside accessor over the user
//! repository. The cache is an optimization only: every operation returns
//! the same result with it disabled.

pub mod cache;
pub mod dto;
pub mod r#impl;
pub mod role_policy;
pub mod uid_allocator;
pub mod user_service;

pub use cache::*;
pub use dto::*;
pub use r#impl::*;
pub use role_policy::*;
pub use uid_allocator::*;
pub use user_service::*;

#[cfg(test)]
pub(crate) mod test_support;
