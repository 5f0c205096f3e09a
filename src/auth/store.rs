// Credential store abstraction and an in-memory implementation

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::auth::{
    error::AuthError,
    models::{NewUser, ProfileUpdate, Role, User},
};

/// Hex SHA-256 of a refresh token; only the digest is ever persisted
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persistence for user identities and their refresh-token session
///
/// Usernames and emails are unique case-insensitively. Implementations report
/// a duplicate as `EmailAlreadyExists` or `UsernameAlreadyExists`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError>;

    /// Look a user up by username or email
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError>;

    async fn list_users(&self) -> Result<Vec<User>, AuthError>;

    /// Overwrite (or clear, with `None`) the trusted refresh-token digest
    async fn set_refresh_token(&self, user_id: i32, digest: Option<&str>) -> Result<(), AuthError>;

    /// Apply the fields present in `profile`; absent fields are left alone
    async fn update_profile(&self, user_id: i32, profile: &ProfileUpdate) -> Result<User, AuthError>;

    async fn update_role(&self, user_id: i32, role: Role) -> Result<User, AuthError>;

    /// Replace the password hash and drop the stored refresh session
    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AuthError>;

    /// Returns false when no such user existed
    async fn delete_user(&self, user_id: i32) -> Result<bool, AuthError>;
}

#[derive(Default)]
struct MemoryInner {
    next_id: i32,
    users: HashMap<i32, User>,
}

/// Credential store held in process memory
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let mut inner = self.inner.write().await;

        for existing in inner.users.values() {
            if existing.email.eq_ignore_ascii_case(&user.email) {
                return Err(AuthError::EmailAlreadyExists);
            }
            if existing.username.eq_ignore_ascii_case(&user.username) {
                return Err(AuthError::UsernameAlreadyExists);
            }
        }

        inner.next_id += 1;
        let now = Utc::now();
        let created = User {
            id: inner.next_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| {
                u.username.eq_ignore_ascii_case(identifier) || u.email.eq_ignore_ascii_case(identifier)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn set_refresh_token(&self, user_id: i32, digest: Option<&str>) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.refresh_token = digest.map(str::to_string);
        }
        Ok(())
    }

    async fn update_profile(&self, user_id: i32, profile: &ProfileUpdate) -> Result<User, AuthError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;

        if let Some(display_name) = &profile.display_name {
            user.display_name = Some(display_name.clone());
        }
        if let Some(bio) = &profile.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(avatar_url) = &profile.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn update_role(&self, user_id: i32, role: Role) -> Result<User, AuthError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        user.refresh_token = None;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, user_id: i32) -> Result<bool, AuthError> {
        Ok(self.inner.write().await.users.remove(&user_id).is_some())
    }
}
