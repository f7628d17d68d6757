//! User-related DTOs.

use chrono::{DateTime, Utc};
use gatepass_core::rules::{not_blank, valid_phone, valid_user_id};
use gatepass_core::{Education, GatepassError, GatepassResult, User, UserRole, UserStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Profile submitted at registration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(custom(function = "valid_user_id"))]
    pub id: String,

    #[validate(
        length(max = 128, message = "Name cannot exceed 128 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(custom(function = "valid_phone"))]
    pub phone: String,

    #[validate(custom(function = "not_blank", message = "University is required"))]
    pub university: String,

    #[validate(length(min = 1, max = 8, message = "Jersey size must be 1-8 characters"))]
    pub size_jersey: String,

    #[validate(length(max = 500))]
    pub food_limitation: Option<String>,

    #[validate(length(max = 64))]
    pub invitation_code: Option<String>,

    pub status: UserStatus,

    #[validate(length(max = 16))]
    pub graduated_year: Option<String>,

    #[validate(length(max = 128))]
    pub faculty: Option<String>,

    pub education: Education,
}

impl RegisterRequest {
    /// Builds the user record once the generated parts are known.
    #[must_use]
    pub fn into_user(
        self,
        uid: String,
        role: UserRole,
        image_url: String,
        registered_at: DateTime<Utc>,
    ) -> User {
        User {
            id: self.id,
            uid,
            name: self.name,
            email: self.email,
            phone: self.phone,
            university: self.university,
            size_jersey: self.size_jersey,
            food_limitation: self.food_limitation,
            invitation_code: self.invitation_code,
            status: self.status,
            graduated_year: self.graduated_year,
            faculty: self.faculty,
            image_url,
            last_entered: None,
            role,
            education: self.education,
            registered_at,
        }
    }
}

/// Profile image uploaded alongside a registration.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Creates an upload.
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Rejects empty payloads.
    pub fn validate(&self) -> GatepassResult<()> {
        if self.bytes.is_empty() {
            return Err(GatepassError::validation("image: Image file is empty"));
        }
        Ok(())
    }

    /// The client file name reduced to its last path segment.
    #[must_use]
    pub fn sanitized_file_name(&self) -> &str {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("image")
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 128), custom(function = "not_blank", message = "Name cannot be blank"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(custom(function = "valid_phone"))]
    pub phone: Option<String>,

    #[validate(custom(function = "not_blank", message = "University cannot be blank"))]
    pub university: Option<String>,

    #[validate(length(min = 1, max = 8))]
    pub size_jersey: Option<String>,

    #[validate(length(max = 500))]
    pub food_limitation: Option<String>,

    #[validate(length(max = 64))]
    pub invitation_code: Option<String>,

    pub status: Option<UserStatus>,

    #[validate(length(max = 16))]
    pub graduated_year: Option<String>,

    #[validate(length(max = 128))]
    pub faculty: Option<String>,

    pub education: Option<Education>,
}

impl UpdateUserRequest {
    /// Copies the provided fields onto `user`.
    pub fn apply_to(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(university) = self.university {
            user.university = university;
        }
        if let Some(size_jersey) = self.size_jersey {
            user.size_jersey = size_jersey;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        if let Some(education) = self.education {
            user.education = education;
        }
        if self.food_limitation.is_some() {
            user.food_limitation = self.food_limitation;
        }
        if self.invitation_code.is_some() {
            user.invitation_code = self.invitation_code;
        }
        if self.graduated_year.is_some() {
            user.graduated_year = self.graduated_year;
        }
        if self.faculty.is_some() {
            user.faculty = self.faculty;
        }
    }
}

/// Request to change a user's role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// Request for a fresh token.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(custom(function = "valid_user_id"))]
    pub id: String,
}

/// Token handed back after registration or sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub user_id: String,
    pub access_token: String,
}

/// Where to fetch a user's check-in QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub user_id: String,
    pub qr_url: String,
}
