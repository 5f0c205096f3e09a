// Authentication module
// JWT access/refresh sessions, Argon2id passwords and role-based access control

pub mod cookie;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use cookie::{CookiePolicy, REFRESH_COOKIE_NAME};
pub use error::AuthError;
pub use extract::ValidJson;
pub use handlers::{
    change_password_handler, login_handler, logout_handler, me_handler, refresh_handler,
    signup_handler,
};
pub use middleware::{require_auth, AuthenticatedUser, RequireRole};
pub use models::{AuthResponse, LoginRequest, Role, SignupRequest, User, UserResponse};
pub use password::{PasswordParams, PasswordService};
pub use repository::PgCredentialStore;
pub use service::{AuthService, Session};
pub use store::{CredentialStore, MemoryCredentialStore};
pub use token::{Claims, TokenError, TokenService};
