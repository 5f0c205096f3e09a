// PostgreSQL-backed credential store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::auth::{
    error::AuthError,
    models::{NewUser, ProfileUpdate, Role, User},
    store::CredentialStore,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, display_name, bio, \
                            avatar_url, refresh_token, created_at, updated_at";

/// Row shape of the `users` table; role is stored as text
#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    display_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|_| {
            AuthError::DatabaseError(format!("user {} has unknown role '{}'", row.id, row.role))
        })?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            display_name: row.display_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique-index violation to the field it protects
fn classify_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            if constraint.contains("username") {
                return AuthError::UsernameAlreadyExists;
            }
            return AuthError::EmailAlreadyExists;
        }
    }
    AuthError::DatabaseError(err.to_string())
}

/// User repository for database operations
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new PgCredentialStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_user(&self, sql: &str, id: i32) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, UserRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role, display_name, bio, avatar_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.display_name)
            .bind(&user.bio)
            .bind(&user.avatar_url)
            .fetch_one(&self.pool)
            .await
            .map_err(classify_insert_error)?;

        User::try_from(row)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) \
             LIMIT 1"
        );

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        self.fetch_one_user(&sql, id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");

        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn set_refresh_token(&self, user_id: i32, digest: Option<&str>) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
            .bind(digest)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_profile(&self, user_id: i32, profile: &ProfileUpdate) -> Result<User, AuthError> {
        let sql = format!(
            "UPDATE users \
             SET display_name = COALESCE($1, display_name), \
                 bio = COALESCE($2, bio), \
                 avatar_url = COALESCE($3, avatar_url), \
                 updated_at = NOW() \
             WHERE id = $4 \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(&profile.display_name)
            .bind(&profile.bio)
            .bind(&profile.avatar_url)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::UserNotFound)
            .and_then(User::try_from)
    }

    async fn update_role(&self, user_id: i32, role: Role) -> Result<User, AuthError> {
        let sql = format!(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(role.as_str())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::UserNotFound)
            .and_then(User::try_from)
    }

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, refresh_token = NULL, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: i32) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
