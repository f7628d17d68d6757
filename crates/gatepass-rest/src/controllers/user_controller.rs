//! Attendee controller.

use crate::{
    extractors::{RegistrationForm, ValidatedJson},
    responses::{created, no_content, ok, ApiResponse, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use gatepass_core::{ErrorResponse, User};
use gatepass_service::{
    QrResponse, RegisterRequest, SignInRequest, TokenResponse, UpdateRoleRequest,
    UpdateUserRequest,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::IntoParams;

/// Query parameters of the user listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Case-insensitive name fragment.
    pub name: Option<String>,
}

/// Creates the user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/register", post(register))
        .route("/signin", post(sign_in))
        .route("/qr/:id", get(get_qr_url).post(scan_qr))
        .route("/role/:id", patch(update_role))
        .route("/staff/:phone", patch(add_staff))
        .route("/phone/:phone", get(get_by_phone))
        .route("/image/*key", get(get_image))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

/// List users, optionally filtered by name.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users", body = Vec<User>)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Vec<User>> {
    let users = match query.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => state.user_service.get_by_name(name).await?,
        _ => state.user_service.get_all().await?,
    };
    ok(users)
}

/// Register a new attendee.
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "users",
    request_body(content = RegisterRequest, content_type = "multipart/form-data", description = "Profile fields plus an `image` file part"),
    responses(
        (status = 201, description = "Registered", body = TokenResponse),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 409, description = "Duplicate id or phone", body = ErrorResponse),
        (status = 502, description = "Image upload failed", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    form: RegistrationForm,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), AppError> {
    debug!("Register request: {}", form.request.id);

    let response = state
        .user_service
        .register(form.request, form.image)
        .await?;
    Ok(created(response))
}

/// Issue a fresh token.
#[utoipa::path(
    post,
    path = "/api/users/signin",
    tag = "users",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> ApiResult<TokenResponse> {
    let response = state.user_service.sign_in(request).await?;
    ok(response)
}

/// Get the check-in QR code URL of a user.
#[utoipa::path(
    get,
    path = "/api/users/qr/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "QR code URL", body = QrResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn get_qr_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QrResponse> {
    let response = state.user_service.get_qr_url(&id).await?;
    ok(response)
}

/// Check a user in. Succeeds at most once per calendar day.
#[utoipa::path(
    post,
    path = "/api/users/qr/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Checked in", body = User),
        (status = 400, description = "Already entered today; `data` holds the user", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn scan_qr(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    debug!("Scan QR request: {}", id);

    let user = state.user_service.scan_qr(&id).await?;
    ok(user)
}

/// Change a user's role.
#[utoipa::path(
    patch,
    path = "/api/users/role/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<User> {
    debug!("Update role request: {} -> {}", id, request.role);

    let user = state.user_service.update_role(&id, request).await?;
    ok(user)
}

/// Promote the user with the given phone to staff.
#[utoipa::path(
    patch,
    path = "/api/users/staff/{phone}",
    tag = "users",
    params(("phone" = String, Path, description = "Phone number")),
    responses(
        (status = 200, description = "Promoted", body = User),
        (status = 400, description = "Already staff; `data` holds the user", body = ErrorResponse),
        (status = 404, description = "Unknown phone", body = ErrorResponse)
    )
)]
pub async fn add_staff(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> ApiResult<User> {
    let user = state.user_service.add_staff(&phone).await?;
    ok(user)
}

/// Get a user by phone.
#[utoipa::path(
    get,
    path = "/api/users/phone/{phone}",
    tag = "users",
    params(("phone" = String, Path, description = "Phone number")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Unknown phone", body = ErrorResponse)
    )
)]
pub async fn get_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> ApiResult<User> {
    let user = state.user_service.get_by_phone(&phone).await?;
    ok(user)
}

/// Serve a stored profile image.
#[utoipa::path(
    get,
    path = "/api/users/image/{key}",
    tag = "users",
    params(("key" = String, Path, description = "Object key, may contain slashes")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No such image", body = ErrorResponse)
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let object = state.user_service.get_image(&key).await?;
    let content_type = object
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], object.bytes).into_response())
}

/// Get a user by id.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    let user = state.user_service.get_by_id(&id).await?;
    ok(user)
}

/// Update a user's profile.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 409, description = "Phone already in use", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<User> {
    debug!("Update user request: {}", id);

    let user = state.user_service.update_profile(&id, request).await?;
    ok(user)
}

/// Delete a user.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    debug!("Delete user request: {}", id);

    state.user_service.delete(&id).await?;
    Ok(no_content())
}
