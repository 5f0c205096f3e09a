// HTTP handlers for authentication endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};

use crate::auth::{
    cookie::{get_cookie, REFRESH_COOKIE_NAME},
    error::AuthError,
    extract::ValidJson,
    middleware::AuthenticatedUser,
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RefreshResponse,
        SignupRequest, UserResponse,
    },
    service::AuthService,
};

type SetCookie = [(header::HeaderName, String); 1];

/// Login a user
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; refresh token set as HTTP-only cookie", body = AuthResponse),
        (status = 400, description = "Missing identifier or password"),
        (status = 401, description = "Invalid credentials", example = json!({"error": "Invalid username/email or password", "code": "INVALID_CREDENTIALS"})),
        (status = 429, description = "Too many attempts"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<(SetCookie, Json<AuthResponse>), AuthError> {
    let session = service.login(request).await?;
    let cookie = service.cookie_policy().refresh_cookie(&session.refresh_token);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            access_token: session.access_token,
            user: session.user,
        }),
    ))
}

/// Register a new user
/// POST /api/auth/signup
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and logged in", body = AuthResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email or username already taken", example = json!({"error": "Email already exists", "code": "EMAIL_EXISTS"})),
        (status = 429, description = "Too many attempts"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn signup_handler(
    State(service): State<Arc<AuthService>>,
    ValidJson(request): ValidJson<SignupRequest>,
) -> Result<(StatusCode, SetCookie, Json<AuthResponse>), AuthError> {
    let session = service.signup(request).await?;
    let cookie = service.cookie_policy().refresh_cookie(&session.refresh_token);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            access_token: session.access_token,
            user: session.user,
        }),
    ))
}

/// Issue a new access token from the refresh cookie
/// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Missing, invalid or superseded refresh cookie"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AuthError> {
    let cookie = get_cookie(&headers, REFRESH_COOKIE_NAME);
    let access_token = service.refresh(cookie.as_deref()).await?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout; always succeeds and clears the refresh cookie
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> (SetCookie, Json<MessageResponse>) {
    let cookie = get_cookie(&headers, REFRESH_COOKIE_NAME);
    service.logout(cookie.as_deref()).await;

    (
        [(header::SET_COOKIE, service.cookie_policy().clear_cookie())],
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// Get current user information (protected endpoint)
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(service): State<Arc<AuthService>>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, AuthError> {
    Ok(Json(service.current_user(user.user_id).await?))
}

/// Change the caller's password and end the refresh session
/// PUT /api/auth/password
#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed; log in again", body = MessageResponse),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Wrong current password or missing token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(service): State<Arc<AuthService>>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> Result<(SetCookie, Json<MessageResponse>), AuthError> {
    service.change_password(user.user_id, request).await?;

    Ok((
        [(header::SET_COOKIE, service.cookie_policy().clear_cookie())],
        Json(MessageResponse::new("Password changed, please log in again")),
    ))
}
