// HTTP handlers for user administration endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::{
    extract::ValidJson,
    middleware::AuthenticatedUser,
    models::{ProfileUpdate, UpdateRoleRequest, UserResponse},
    AuthError,
};
use crate::users::UserService;

/// List all users
/// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Requires admin role")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(service): State<Arc<UserService>>,
) -> Result<Json<Vec<UserResponse>>, AuthError> {
    Ok(Json(service.list_users().await?))
}

/// Get one user
/// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Requires admin or editor role"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user_handler(
    State(service): State<Arc<UserService>>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, AuthError> {
    Ok(Json(service.get_user(user_id).await?))
}

/// Update the caller's profile
/// PATCH /api/users/me
#[utoipa::path(
    patch,
    path = "/api/users/me",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid profile fields"),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_profile_handler(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    ValidJson(profile): ValidJson<ProfileUpdate>,
) -> Result<Json<UserResponse>, AuthError> {
    Ok(Json(service.update_profile(user.user_id, profile).await?))
}

/// Change a user's role (admin only)
/// PUT /api/users/{id}/role
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 400, description = "Unknown role or own account"),
        (status = 403, description = "Requires admin role", example = json!({"error": "You do not have permission to perform this action", "code": "INSUFFICIENT_PERMISSIONS"})),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_role_handler(
    State(service): State<Arc<UserService>>,
    actor: AuthenticatedUser,
    Path(user_id): Path<i32>,
    ValidJson(request): ValidJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    Ok(Json(service.update_role(&actor, user_id, &request.role).await?))
}

/// Delete a user (admin only)
/// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Own account"),
        (status = 403, description = "Requires admin role"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(service): State<Arc<UserService>>,
    actor: AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AuthError> {
    service.delete_user(&actor, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
