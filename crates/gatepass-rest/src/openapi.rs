//! OpenAPI documentation configuration.

use crate::controllers::HealthResponse;
use gatepass_core::{Education, ErrorResponse, FieldError, User, UserRole, UserStatus};
use gatepass_service::{
    QrResponse, RegisterRequest, SignInRequest, TokenResponse, UpdateRoleRequest,
    UpdateUserRequest,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the Gatepass API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatepass API",
        version = "1.0.0",
        description = "Attendee registration and check-in",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        crate::controllers::user_controller::list_users,
        crate::controllers::user_controller::register,
        crate::controllers::user_controller::sign_in,
        crate::controllers::user_controller::get_qr_url,
        crate::controllers::user_controller::scan_qr,
        crate::controllers::user_controller::update_role,
        crate::controllers::user_controller::add_staff,
        crate::controllers::user_controller::get_by_phone,
        crate::controllers::user_controller::get_image,
        crate::controllers::user_controller::get_user,
        crate::controllers::user_controller::update_user,
        crate::controllers::user_controller::delete_user,
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::liveness_check,
    ),
    components(
        schemas(
            User,
            UserRole,
            UserStatus,
            Education,
            ErrorResponse,
            FieldError,
            RegisterRequest,
            SignInRequest,
            UpdateUserRequest,
            UpdateRoleRequest,
            TokenResponse,
            QrResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "users", description = "Attendee registration, check-in and management"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;
