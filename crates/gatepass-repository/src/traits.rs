//! Repository trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatepass_core::{GatepassResult, Interface, User};

/// User repository trait.
///
/// Uniqueness of `id`, `phone` and `uid` is enforced by the store; violations
/// surface as `GatepassError::Conflict`.
#[async_trait]
pub trait UserRepository: Interface + Send + Sync {
    /// Finds a user by ID.
    async fn find_by_id(&self, id: &str) -> GatepassResult<Option<User>>;

    /// Finds a user by phone.
    async fn find_by_phone(&self, phone: &str) -> GatepassResult<Option<User>>;

    /// Returns every user.
    async fn find_all(&self) -> GatepassResult<Vec<User>>;

    /// Finds users whose name contains `fragment`, case-insensitively.
    async fn search_by_name(&self, fragment: &str) -> GatepassResult<Vec<User>>;

    /// Checks if a uid is taken.
    async fn exists_by_uid(&self, uid: &str) -> GatepassResult<bool>;

    /// Saves a new user.
    async fn save(&self, user: &User) -> GatepassResult<User>;

    /// Updates an existing user and returns the stored row.
    ///
    /// `last_entered` is left as stored; only [`record_entry`](Self::record_entry)
    /// changes it.
    async fn update(&self, user: &User) -> GatepassResult<User>;

    /// Sets `last_entered = at` only if the user has no entry at or after
    /// `not_before`. Returns the updated user, or `None` when the condition
    /// did not hold or the user does not exist.
    async fn record_entry(
        &self,
        id: &str,
        at: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> GatepassResult<Option<User>>;

    /// Deletes a user by ID.
    async fn delete(&self, id: &str) -> GatepassResult<bool>;
}
