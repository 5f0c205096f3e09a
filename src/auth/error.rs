// Authentication and authorization error types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::models::Role;

/// Authentication and authorization error types
#[derive(Debug, Error)]
pub enum AuthError {
    // Input errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Malformed Authorization header")]
    MalformedAuthHeader,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    ExpiredToken,
    /// Refresh cookie that fails verification or no longer matches the stored session
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    // Authorization errors
    /// User lacks one of the roles allowed on the route
    #[error("Insufficient permissions: role '{actual}' not in {allowed:?}")]
    InsufficientPermissions { allowed: Vec<Role>, actual: Role },
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    // Store outcomes
    #[error("User not found")]
    UserNotFound,
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("Username already exists")]
    UsernameAlreadyExists,

    // Server-side failures
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Password hashing error: {0}")]
    PasswordHashError(String),
    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::ValidationError(msg) => debug!("Rejected auth input: {}", msg),
            AuthError::InvalidCredentials => warn!("Failed login attempt"),
            AuthError::MissingToken => warn!("Missing token in request"),
            AuthError::MalformedAuthHeader => warn!("Malformed Authorization header"),
            AuthError::InvalidToken => warn!("Invalid token attempt"),
            AuthError::ExpiredToken => debug!("Expired token presented"),
            AuthError::InvalidRefreshToken => warn!("Rejected refresh token"),
            AuthError::InsufficientPermissions { allowed, actual } => {
                warn!("Authorization failed: allowed roles {:?}, user has role '{}'", allowed, actual)
            }
            AuthError::InvalidRole(msg) => warn!("Invalid role encountered: {}", msg),
            AuthError::UserNotFound => debug!("User not found"),
            AuthError::EmailAlreadyExists | AuthError::UsernameAlreadyExists => {
                debug!("Signup conflict: {}", self)
            }
            AuthError::DatabaseError(msg) => error!("Database error in auth: {}", msg),
            AuthError::PasswordHashError(msg) => error!("Password hashing error: {}", msg),
            AuthError::TokenGenerationError(msg) => error!("Token generation error: {}", msg),
            AuthError::ConfigError(msg) => error!("Authorization configuration error: {}", msg),
        }

        let body = Json(json!({
            "error": self.error_message(),
            "code": self.error_code(),
        }));

        (self.status_code(), body).into_response()
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::MalformedAuthHeader => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::InvalidRole(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::UsernameAlreadyExists => StatusCode::CONFLICT,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordHashError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code returned alongside the message
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ValidationError(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingToken => "NO_TOKEN",
            AuthError::MalformedAuthHeader | AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::ExpiredToken => "TOKEN_EXPIRED",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
            AuthError::InvalidRole(_) => "INVALID_ROLE",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::EmailAlreadyExists => "EMAIL_EXISTS",
            AuthError::UsernameAlreadyExists => "USERNAME_EXISTS",
            AuthError::ConfigError(_) => "SERVER_MISCONFIGURED",
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get a descriptive error message for this error
    /// This message is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::InvalidCredentials => "Invalid username/email or password".to_string(),
            AuthError::MissingToken => "Authentication required".to_string(),
            AuthError::MalformedAuthHeader => {
                "Authorization header must be 'Bearer <token>'".to_string()
            }
            AuthError::InvalidToken => "Invalid token".to_string(),
            AuthError::ExpiredToken => "Token has expired".to_string(),
            AuthError::InvalidRefreshToken => {
                "Session is no longer valid, please log in again".to_string()
            }
            AuthError::InsufficientPermissions { .. } => {
                "You do not have permission to perform this action".to_string()
            }
            AuthError::InvalidRole(msg) => format!("Invalid role: {}", msg),
            AuthError::UserNotFound => "User not found".to_string(),
            AuthError::EmailAlreadyExists => "Email already exists".to_string(),
            AuthError::UsernameAlreadyExists => "Username already exists".to_string(),
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_)
            | AuthError::ConfigError(_) => "Internal server error".to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::ValidationError(crate::validation::describe_errors(&errors))
    }
}

impl From<JsonRejection> for AuthError {
    /// Serde details go to the log, the client gets a fixed message
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());

        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Request body must be JSON with Content-Type: application/json"
            }
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::JsonDataError(_) => "Request body has missing or invalid fields",
            _ => "Request body could not be read",
        };
        AuthError::ValidationError(message.to_string())
    }
}
