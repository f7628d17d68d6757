//! User service trait definition.

use crate::dto::{
    ImageUpload, QrResponse, RegisterRequest, SignInRequest, TokenResponse, UpdateRoleRequest,
    UpdateUserRequest,
};
use async_trait::async_trait;
use gatepass_core::{GatepassResult, Interface, StoredObject, User};

/// User service trait.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait UserService: Interface + Send + Sync {
    /// Registers a new attendee and returns their first token.
    ///
    /// Nothing is persisted when the image upload fails. A token failure
    /// leaves the user registered.
    async fn register(
        &self,
        request: RegisterRequest,
        image: ImageUpload,
    ) -> GatepassResult<TokenResponse>;

    /// Issues a fresh token for an existing user.
    async fn sign_in(&self, request: SignInRequest) -> GatepassResult<TokenResponse>;

    /// Lists every user.
    async fn get_all(&self) -> GatepassResult<Vec<User>>;

    /// Lists users whose name contains `name`, case-insensitively.
    async fn get_by_name(&self, name: &str) -> GatepassResult<Vec<User>>;

    /// Gets a user by ID.
    async fn get_by_id(&self, id: &str) -> GatepassResult<User>;

    /// Gets a user by phone.
    async fn get_by_phone(&self, phone: &str) -> GatepassResult<User>;

    /// Returns the URL of the user's check-in QR code.
    async fn get_qr_url(&self, id: &str) -> GatepassResult<QrResponse>;

    /// Checks a user in.
    ///
    /// At most one scan per calendar day succeeds; later scans fail with
    /// `AlreadyEntered` carrying the unchanged user.
    async fn scan_qr(&self, id: &str) -> GatepassResult<User>;

    /// Applies a partial profile update.
    async fn update_profile(&self, id: &str, request: UpdateUserRequest) -> GatepassResult<User>;

    /// Overwrites a user's role.
    async fn update_role(&self, id: &str, request: UpdateRoleRequest) -> GatepassResult<User>;

    /// Promotes the user with `phone` to staff.
    async fn add_staff(&self, phone: &str) -> GatepassResult<User>;

    /// Deletes a user.
    async fn delete(&self, id: &str) -> GatepassResult<()>;

    /// Fetches a stored profile image.
    async fn get_image(&self, key: &str) -> GatepassResult<StoredObject>;
}
