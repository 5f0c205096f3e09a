use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::auth::{
    middleware::AuthenticatedUser,
    models::{ProfileUpdate, Role, UserResponse},
    store::CredentialStore,
    AuthError,
};

/// Service layer for user administration
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CredentialStore>,
}

impl UserService {
    /// Create a new UserService
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>, AuthError> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_user(&self, user_id: i32) -> Result<UserResponse, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the caller's own profile fields
    pub async fn update_profile(
        &self,
        user_id: i32,
        profile: ProfileUpdate,
    ) -> Result<UserResponse, AuthError> {
        profile.validate()?;

        let user = self.store.update_profile(user_id, &profile).await?;
        Ok(user.into())
    }

    /// Change another user's role
    ///
    /// An admin cannot change their own role, so the last admin cannot lock
    /// everyone out by demoting themselves.
    pub async fn update_role(
        &self,
        actor: &AuthenticatedUser,
        user_id: i32,
        role: &str,
    ) -> Result<UserResponse, AuthError> {
        let role: Role = role.parse()?;

        if actor.user_id == user_id {
            return Err(AuthError::ValidationError(
                "You cannot change your own role".to_string(),
            ));
        }

        let user = self.store.update_role(user_id, role).await?;
        info!("User {} set role of user {} to {}", actor.user_id, user_id, role);
        Ok(user.into())
    }

    /// Remove another user
    pub async fn delete_user(&self, actor: &AuthenticatedUser, user_id: i32) -> Result<(), AuthError> {
        if actor.user_id == user_id {
            return Err(AuthError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        if !self.store.delete_user(user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        info!("User {} deleted user {}", actor.user_id, user_id);
        Ok(())
    }
}
