//! Contracts of the external collaborators used by the service layer.

use crate::{GatepassResult, Interface, UserRole};
use async_trait::async_trait;

/// Issues bearer tokens for registered users.
///
/// Tokens are opaque to the caller; they carry the user id and role.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait TokenIssuer: Interface {
    /// Issues an access token for the given user.
    async fn issue(&self, user_id: &str, role: UserRole) -> GatepassResult<String>;
}

/// A stored object's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Object storage for uploaded images.
///
/// Retry and backoff are the implementation's concern.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Interface {
    /// Uploads an object and returns its public URL.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> GatepassResult<String>;

    /// Downloads an object. A missing key yields `NotFound`.
    async fn download(&self, bucket: &str, key: &str) -> GatepassResult<StoredObject>;
}
