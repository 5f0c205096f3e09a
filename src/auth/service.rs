// Authentication service - session management layer

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::auth::{
    cookie::CookiePolicy,
    error::AuthError,
    models::{ChangePasswordRequest, LoginRequest, NewUser, Role, SignupRequest, User, UserResponse},
    password::PasswordService,
    store::{token_digest, CredentialStore},
    token::TokenService,
};

/// Tokens and public view produced by a successful login or signup
#[derive(Debug)]
pub struct Session {
    pub access_token: String,
    /// Delivered to the client only through the HTTP-only cookie
    pub refresh_token: String,
    pub user: UserResponse,
}

/// Authentication service coordinating login, signup, refresh and logout
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
    cookies: CookiePolicy,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: PasswordService,
        tokens: Arc<TokenService>,
        cookies: CookiePolicy,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            cookies,
        }
    }

    pub fn cookie_policy(&self) -> &CookiePolicy {
        &self.cookies
    }

    /// Hash on the blocking pool; Argon2 is deliberately slow
    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| AuthError::PasswordHashError(e.to_string()))?
    }

    /// Verify on the blocking pool; `None` runs the dummy check for unknown users
    async fn verify_password(&self, hash: Option<String>, password: String) -> Result<bool, AuthError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => passwords.verify(&hash, &password),
            None => {
                passwords.verify_dummy(&password);
                false
            }
        })
        .await
        .map_err(|e| AuthError::PasswordHashError(e.to_string()))
    }

    /// Issue a token pair and make the new refresh token the only trusted one
    async fn start_session(&self, user: User) -> Result<Session, AuthError> {
        let (access_token, refresh_token) = self.tokens.issue_pair(user.id, user.role)?;
        self.store
            .set_refresh_token(user.id, Some(&token_digest(&refresh_token)))
            .await?;

        Ok(Session {
            access_token,
            refresh_token,
            user: user.into(),
        })
    }

    /// Login with username or email
    ///
    /// Unknown identifiers and wrong passwords are both reported as
    /// `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AuthError> {
        request.validate()?;

        let identifier = request.identifier.trim();
        let user = self.store.find_by_identifier(identifier).await?;

        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = self.verify_password(hash, request.password).await?;

        let user = match user {
            Some(user) if verified => user,
            _ => return Err(AuthError::InvalidCredentials),
        };

        info!("User {} logged in", user.id);
        self.start_session(user).await
    }

    /// Register a new subscriber and log them in
    pub async fn signup(&self, request: SignupRequest) -> Result<Session, AuthError> {
        request.validate()?;

        if let Some(requested) = &request.role {
            warn!("Ignoring role {} supplied at signup for '{}'", requested, request.username);
        }

        let password_hash = self.hash_password(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username: request.username.trim().to_string(),
                email: request.email.trim().to_string(),
                password_hash,
                role: Role::lowest(),
                display_name: request.display_name,
                bio: request.bio,
                avatar_url: request.avatar_url,
            })
            .await?;

        info!("Registered user {} ({})", user.id, user.username);
        self.start_session(user).await
    }

    /// Exchange the refresh cookie for a new access token
    ///
    /// The refresh token itself is not rotated. Any verification failure, or a
    /// token that is no longer the one stored for the user, is `InvalidRefreshToken`.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AuthError> {
        let token = refresh_token.ok_or(AuthError::MissingToken)?;

        let claims = self.tokens.verify_refresh(token)?.map_err(|e| {
            debug!("Refresh token failed verification: {}", e);
            AuthError::InvalidRefreshToken
        })?;

        let user = self
            .store
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        match user.refresh_token.as_deref() {
            Some(stored) if stored == token_digest(token) => {}
            _ => {
                warn!("Stale refresh token presented for user {}", user.id);
                return Err(AuthError::InvalidRefreshToken);
            }
        }

        self.tokens.issue_access(user.id, user.role)
    }

    /// Best-effort logout; always succeeds from the caller's point of view
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else {
            debug!("Logout without refresh cookie");
            return;
        };

        let claims = match self.tokens.verify_refresh(token) {
            Ok(Ok(claims)) => claims,
            Ok(Err(e)) => {
                debug!("Logout with undecodable refresh token: {}", e);
                return;
            }
            Err(e) => {
                error!("Cannot decode refresh token on logout: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set_refresh_token(claims.user_id, None).await {
            error!("Failed to clear refresh token for user {}: {}", claims.user_id, e);
            return;
        }
        info!("User {} logged out", claims.user_id);
    }

    /// Get current user information
    pub async fn current_user(&self, user_id: i32) -> Result<UserResponse, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the caller's password; drops the stored refresh session
    pub async fn change_password(
        &self,
        user_id: i32,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        request.validate()?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .verify_password(Some(user.password_hash), request.current_password)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = self.hash_password(request.new_password).await?;
        self.store.update_password(user_id, &password_hash).await?;

        info!("User {} changed password", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        password::PasswordParams,
        store::MemoryCredentialStore,
        token::verify_token,
    };
    use chrono::Duration;

    const ACCESS: &str = "service_test_access_secret";
    const REFRESH: &str = "service_test_refresh_secret";

    struct Fixture {
        service: AuthService,
        store: Arc<MemoryCredentialStore>,
        passwords: PasswordService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryCredentialStore::new());
        let passwords = PasswordService::new(PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let tokens = Arc::new(TokenService::with_secrets(ACCESS, REFRESH));
        let service = AuthService::new(
            store.clone(),
            passwords.clone(),
            tokens,
            CookiePolicy::new(false, Duration::days(7)),
        );

        Fixture {
            service,
            store,
            passwords,
        }
    }

    /// Insert a user directly, bypassing signup so any role can be seeded
    async fn seed_user(fx: &Fixture, username: &str, email: &str, password: &str, role: Role) -> User {
        fx.store
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: fx.passwords.hash(password).unwrap(),
                role,
                display_name: None,
                bio: None,
                avatar_url: None,
            })
            .await
            .unwrap()
    }

    fn login_request(identifier: &str, password: &str) -> LoginRequest {
        LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        }
    }

    fn signup_request(username: &str, email: &str, role: Option<&str>) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "longenough1".to_string(),
            display_name: Some("New Writer".to_string()),
            bio: None,
            avatar_url: None,
            role: role.map(|r| serde_json::Value::String(r.to_string())),
        }
    }

    #[tokio::test]
    async fn test_login_token_carries_stored_role() {
        let fx = fixture();
        seed_user(&fx, "editor1", "editor@test.com", "editorpass", Role::Editor).await;

        for identifier in ["editor1", "editor@test.com", "EDITOR@test.com"] {
            let session = fx.service.login(login_request(identifier, "editorpass")).await.unwrap();
            let claims = verify_token(&session.access_token, ACCESS).unwrap();
            assert_eq!(claims.role, Role::Editor);
            assert_eq!(session.user.role, Role::Editor);
        }
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let fx = fixture();
        seed_user(&fx, "admin", "admin@test.com", "adminpass", Role::Admin).await;

        let wrong_password = fx
            .service
            .login(login_request("admin@test.com", "wrongpass"))
            .await
            .unwrap_err();
        let unknown_user = fx
            .service
            .login(login_request("ghost@test.com", "wrongpass"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.error_code(), unknown_user.error_code());
        assert_eq!(wrong_password.error_message(), unknown_user.error_message());
    }

    #[tokio::test]
    async fn test_login_requires_fields() {
        let fx = fixture();
        let err = fx.service.login(login_request("", "")).await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_login_persists_refresh_digest() {
        let fx = fixture();
        let user = seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Subscriber).await;

        let session = fx.service.login(login_request("jane", "janepass1")).await.unwrap();
        let stored = fx.store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(token_digest(&session.refresh_token)));
    }

    #[tokio::test]
    async fn test_signup_ignores_requested_role() {
        let fx = fixture();
        let session = fx
            .service
            .signup(signup_request("sneaky", "sneaky@test.com", Some("admin")))
            .await
            .unwrap();

        assert_eq!(session.user.role, Role::Subscriber);
        let stored = fx.store.find_by_id(session.user.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Subscriber);
        assert_ne!(stored.password_hash, "longenough1");
        assert_eq!(verify_token(&session.access_token, ACCESS).unwrap().role, Role::Subscriber);
    }

    #[tokio::test]
    async fn test_signup_conflicts() {
        let fx = fixture();
        seed_user(&fx, "admin", "admin@test.com", "adminpass", Role::Admin).await;

        let email_taken = fx
            .service
            .signup(signup_request("someone", "admin@test.com", None))
            .await
            .unwrap_err();
        assert!(matches!(email_taken, AuthError::EmailAlreadyExists));

        let username_taken = fx
            .service
            .signup(signup_request("admin", "fresh@test.com", None))
            .await
            .unwrap_err();
        assert!(matches!(username_taken, AuthError::UsernameAlreadyExists));
    }

    #[tokio::test]
    async fn test_signup_validation_precedes_store() {
        let fx = fixture();
        let mut request = signup_request("ok_name", "bad-email", None);
        request.password = "short".to_string();

        let err = fx.service.signup(request).await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
        assert!(fx.store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token_only() {
        let fx = fixture();
        seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Editor).await;
        let session = fx.service.login(login_request("jane", "janepass1")).await.unwrap();

        let access = fx.service.refresh(Some(&session.refresh_token)).await.unwrap();
        let claims = verify_token(&access, ACCESS).unwrap();
        assert_eq!(claims.user_id, session.user.id);

        // Not rotated: the same cookie keeps working
        assert!(fx.service.refresh(Some(&session.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let fx = fixture();
        assert!(matches!(fx.service.refresh(None).await, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_refresh_rejections_collapse_to_one_signal() {
        let fx = fixture();
        let user = seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Editor).await;

        let expired = crate::auth::token::issue_token(user.id, user.role, REFRESH, Duration::seconds(-5)).unwrap();
        let wrong_key = crate::auth::token::issue_token(user.id, user.role, ACCESS, Duration::hours(1)).unwrap();

        for token in [expired.as_str(), wrong_key.as_str(), "garbage"] {
            let err = fx.service.refresh(Some(token)).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidRefreshToken));
        }
    }

    #[tokio::test]
    async fn test_refresh_after_logout_fails() {
        let fx = fixture();
        seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Subscriber).await;
        let session = fx.service.login(login_request("jane", "janepass1")).await.unwrap();

        fx.service.logout(Some(&session.refresh_token)).await;

        let err = fx.service.refresh(Some(&session.refresh_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_second_login_supersedes_first() {
        let fx = fixture();
        seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Subscriber).await;

        let first = fx.service.login(login_request("jane", "janepass1")).await.unwrap();
        let second = fx.service.login(login_request("jane", "janepass1")).await.unwrap();

        assert!(matches!(
            fx.service.refresh(Some(&first.refresh_token)).await,
            Err(AuthError::InvalidRefreshToken)
        ));
        assert!(fx.service.refresh(Some(&second.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_reflects_role_change() {
        let fx = fixture();
        let user = seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Subscriber).await;
        let session = fx.service.login(login_request("jane", "janepass1")).await.unwrap();

        fx.store.update_role(user.id, Role::Editor).await.unwrap();

        let access = fx.service.refresh(Some(&session.refresh_token)).await.unwrap();
        assert_eq!(verify_token(&access, ACCESS).unwrap().role, Role::Editor);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let fx = fixture();
        let user = seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Subscriber).await;
        let session = fx.service.login(login_request("jane", "janepass1")).await.unwrap();

        fx.service.logout(None).await;
        fx.service.logout(Some("not-a-token")).await;
        // Undecodable cookie leaves the stored session alone
        assert!(fx.store.find_by_id(user.id).await.unwrap().unwrap().refresh_token.is_some());

        fx.service.logout(Some(&session.refresh_token)).await;
        fx.service.logout(Some(&session.refresh_token)).await;
        assert!(fx.store.find_by_id(user.id).await.unwrap().unwrap().refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_change_password() {
        let fx = fixture();
        let user = seed_user(&fx, "jane", "jane@test.com", "janepass1", Role::Subscriber).await;
        let session = fx.service.login(login_request("jane", "janepass1")).await.unwrap();

        let wrong = fx
            .service
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "nope".to_string(),
                    new_password: "brandnewpass".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));

        fx.service
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "janepass1".to_string(),
                    new_password: "brandnewpass".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.service.refresh(Some(&session.refresh_token)).await,
            Err(AuthError::InvalidRefreshToken)
        ));
        assert!(fx.service.login(login_request("jane", "janepass1")).await.is_err());
        assert!(fx.service.login(login_request("jane", "brandnewpass")).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_refresh_secret_is_server_error() {
        let store = Arc::new(MemoryCredentialStore::new());
        let passwords = PasswordService::new(PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let service = AuthService::new(
            store,
            passwords,
            Arc::new(TokenService::with_secrets(ACCESS, "")),
            CookiePolicy::new(false, Duration::days(7)),
        );

        let err = service.refresh(Some("anything")).await.unwrap_err();
        assert!(matches!(err, AuthError::ConfigError(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
