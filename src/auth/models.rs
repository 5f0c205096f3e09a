// Authentication data models and DTOs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::error::AuthError;
use crate::validation::{validate_not_blank, validate_username};

/// Privilege level of an identity, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Subscriber,
}

impl Role {
    /// Role assigned to every new identity
    pub const fn lowest() -> Self {
        Role::Subscriber
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Subscriber => "subscriber",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::lowest()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "subscriber" => Ok(Role::Subscriber),
            other => Err(AuthError::InvalidRole(other.to_string())),
        }
    }
}

/// Stored identity, as held by the credential store
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// SHA-256 digest of the refresh token currently trusted for this user
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload handed to the credential store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile fields a user may change on their own account
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(max = 80, message = "Display name must not exceed 80 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 1000, message = "Bio must not exceed 1000 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Avatar URL must be a valid URL"))]
    pub avatar_url: Option<String>,
}

/// User response model (excludes password hash and refresh token)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "jane_doe")]
    pub username: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login request DTO
///
/// `identifier` accepts either the username or the email address.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default, alias = "email", alias = "username")]
    #[validate(custom = "validate_not_blank")]
    #[schema(example = "admin@test.com")]
    pub identifier: String,
    #[serde(default)]
    #[validate(custom = "validate_not_blank")]
    pub password: String,
}

/// Signup request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(custom = "validate_username")]
    #[schema(example = "jane_doe")]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "A valid email address is required"))]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(max = 80, message = "Display name must not exceed 80 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 1000, message = "Bio must not exceed 1000 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Avatar URL must be a valid URL"))]
    pub avatar_url: Option<String>,
    /// Accepted so it can be logged, never applied
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub role: Option<serde_json::Value>,
}

/// Password change request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(custom = "validate_not_blank")]
    pub current_password: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub new_password: String,
}

/// Role change request DTO (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "editor")]
    pub role: String,
}

/// Authentication response DTO; the refresh token travels only in the cookie
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

/// Token refresh response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Editor ".parse::<Role>().unwrap(), Role::Editor);
        assert_eq!("subscriber".parse::<Role>().unwrap(), Role::Subscriber);
        assert!(matches!("root".parse::<Role>(), Err(AuthError::InvalidRole(_))));
    }

    #[test]
    fn test_default_role_is_lowest_privilege() {
        assert_eq!(Role::default(), Role::Subscriber);
    }

    #[test]
    fn test_user_response_hides_secrets() {
        let now = Utc::now();
        let user = User {
            id: 7,
            username: "jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role: Role::Editor,
            display_name: None,
            bio: None,
            avatar_url: None,
            refresh_token: Some("digest".to_string()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        let text = json.to_string();
        assert!(!text.contains("argon2"));
        assert!(!text.contains("digest"));
        assert_eq!(json["role"], "editor");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_login_request_accepts_email_alias() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"pw"}"#).unwrap();
        assert_eq!(req.identifier, "a@b.com");
    }

    #[test]
    fn test_login_request_missing_fields_fail_validation() {
        let req: LoginRequest = serde_json::from_str(r#"{"identifier":"jane"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_signup_request_validation() {
        let ok: SignupRequest = serde_json::from_str(
            r#"{"username":"jane_doe","email":"jane@example.com","password":"longenough"}"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad: SignupRequest = serde_json::from_str(
            r#"{"username":"j","email":"not-an-email","password":"short"}"#,
        )
        .unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
